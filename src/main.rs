fn main() -> miette::Result<()> {
    clash::cli::run()
}

fn main() -> anyhow::Result<()> {
    eventboard::cli::run()
}

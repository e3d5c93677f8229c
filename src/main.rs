fn main() -> anyhow::Result<()> {
    eventhub::cli::run()
}

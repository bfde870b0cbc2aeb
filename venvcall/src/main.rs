fn main() -> anyhow::Result<()> {
    venvcall::run_cli()
}

fn main() -> anyhow::Result<()> {
    brrtmock::logging::init_logging()?;
    brrtmock::cli::run_cli()
}

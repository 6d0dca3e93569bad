use rfpflow_config::Config;
use rfpflow_utils::ExitCode;

/// Print the effective configuration. Seeded API keys are never printed.
pub(in crate::cli) fn execute(config: &Config, sources: bool) -> Result<(), ExitCode> {
    if sources {
        match &config.config_path {
            Some(path) => println!("# config file: {}", path.display()),
            None => println!("# config file: none (built-in defaults)"),
        }
        for (key, (value, source)) in config.effective_config() {
            println!("{key} = {value}  [{source}]");
        }
        return Ok(());
    }

    match config.to_toml() {
        Ok(text) => {
            print!("{text}");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ config: cannot render configuration: {e}");
            Err(ExitCode::INTERNAL)
        }
    }
}

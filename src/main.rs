use anyhow::{bail, Context, Result};
use lingua_engine::config::{LoaderConfig, TranslatorConfig};
use lingua_engine::i18n::{Params, Translator};
use lingua_engine::loader::{JsonFileLoader, RetryingLoader};
use lingua_engine::retry::RetryConfig;
use serde_json::Value;
use tracing::info;

const USAGE: &str = "Usage: lingua [--lang CODE] KEY [KEY...] [-- name=value ...]";

#[derive(Debug, Default)]
struct Args {
    lang: Option<String>,
    keys: Vec<String>,
    params: Params,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    let mut in_params = false;

    while let Some(arg) = args.next() {
        if in_params {
            let (name, value) = arg
                .split_once('=')
                .with_context(|| format!("Parameter '{}' is not name=value", arg))?;
            // JSON when it parses (numbers, objects), plain string otherwise
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            parsed.params.insert(name.to_string(), value);
        } else if arg == "--" {
            in_params = true;
        } else if arg == "--lang" {
            parsed.lang = Some(args.next().context("--lang needs a language code")?);
        } else {
            parsed.keys.push(arg);
        }
    }

    if parsed.keys.is_empty() {
        bail!(USAGE);
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lingua_engine=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let config = TranslatorConfig::from_env()?;
    let loader_config = LoaderConfig::from_env()?;
    info!(
        "Serving {:?} from {}*{}",
        config.provided_langs, loader_config.path, loader_config.extension
    );

    let loader = RetryingLoader::new(JsonFileLoader::new(loader_config), RetryConfig::local());
    let translator = Translator::builder(config, loader).build();

    if let Some(lang) = &args.lang {
        translator.set_lang(lang)?;
    }
    translator.wait_for_translation(None).await?;

    for line in translator.instant(&args.keys, &args.params, None) {
        println!("{}", line);
    }

    Ok(())
}

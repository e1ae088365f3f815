use std::{env, fs, process};

use anyhow::{bail, Context};
use log::info;

use mb_adsorption::{
    export, load_model, pipeline::raw_values_from_json, predict, schema, Config, APP_DESCRIPTION,
    APP_TITLE,
};

const CONFIG_VAR: &str = "MB_CONFIG";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
    }

    let res = match args[1].as_str() {
        "schema" => print_schema(),
        "predict" if args.len() >= 3 => run_predict(&args[2], args.get(3).map(String::as_str)),
        _ => usage(&args[0]),
    };

    if let Err(e) = res {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <schema | predict <values.json> [out.csv]>");
    process::exit(1);
}

fn load_config() -> anyhow::Result<Config> {
    match env::var(CONFIG_VAR) {
        Ok(path) => Ok(Config::from_json_file(&path)?),
        Err(_) => Ok(Config::from_env()),
    }
}

fn print_schema() -> anyhow::Result<()> {
    let fields = schema::FIELDS
        .iter()
        .map(|f| -> serde_json::Result<serde_json::Value> {
            let mut value = serde_json::to_value(f)?;
            value["section_title"] = f.section.title().into();
            Ok(value)
        })
        .collect::<serde_json::Result<Vec<_>>>()?;

    let doc = serde_json::json!({
        "title": APP_TITLE,
        "description": APP_DESCRIPTION,
        "choices": schema::CHOICE_LABELS,
        "fields": fields,
    });

    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn run_predict(values_path: &str, out: Option<&str>) -> anyhow::Result<()> {
    let config = load_config()?;

    let model = load_model(&config.model_path).with_context(|| {
        format!(
            "cannot serve predictions until {} is fixed",
            config.model_path.display()
        )
    })?;

    let content = fs::read_to_string(values_path)
        .with_context(|| format!("cannot read '{values_path}'"))?;
    let doc: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("'{values_path}' is not a JSON object of field values"))?;

    let record = match raw_values_from_json(doc).and_then(|raw| predict(&model, &raw)) {
        Ok(record) => record,
        Err(e) if e.field().is_some() => bail!("please correct the input and resubmit: {e}"),
        Err(e) => return Err(e.into()),
    };
    println!("{}", record.summary());

    let out = out.unwrap_or(&config.export_file_name);
    fs::write(out, export::to_delimited_text(&record))
        .with_context(|| format!("cannot write '{out}'"))?;
    info!("exported result to {out} ({})", export::MIME_TYPE);

    Ok(())
}

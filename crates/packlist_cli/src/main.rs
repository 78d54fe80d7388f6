//! `packlist` command line: generate shipment reports from packing-list workbooks.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use packlist_report::{
    EnumOutputMode, EnumTemplateVersion, SpecGenerateOutput, SpecReportOptions, generate_reports,
    inspect_workbook,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "packlist")]
#[command(about = "Turn packing-list workbooks into per-order shipment reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate report workbooks.
    Generate(GenerateArgs),
    /// List sheets, the source sheet and the detected tables.
    Inspect {
        input: PathBuf,
        /// JSON options file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Packing-list workbook (.xlsx).
    input: PathBuf,
    /// Directory receiving the artifacts.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    #[arg(long, value_enum)]
    mode: Option<ArgOutputMode>,
    /// Template workbook holding a `Report` worksheet.
    #[arg(long)]
    template: Option<PathBuf>,
    #[arg(long, value_enum)]
    template_version: Option<ArgTemplateVersion>,
    /// JSON options file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    model_name: Option<String>,
    /// Write soft issues and strict mismatches here.
    #[arg(long)]
    validation_json: Option<PathBuf>,
    #[arg(long)]
    workers: Option<usize>,
    /// Also post the input to a remote endpoint.
    #[cfg(feature = "remote")]
    #[arg(long)]
    remote_url: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ArgOutputMode {
    Separate,
    Combined,
    Both,
}

impl From<ArgOutputMode> for EnumOutputMode {
    fn from(mode: ArgOutputMode) -> Self {
        match mode {
            ArgOutputMode::Separate => Self::Separate,
            ArgOutputMode::Combined => Self::Combined,
            ArgOutputMode::Both => Self::Both,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ArgTemplateVersion {
    V1,
    V2,
}

impl From<ArgTemplateVersion> for EnumTemplateVersion {
    fn from(version: ArgTemplateVersion) -> Self {
        match version {
            ArgTemplateVersion::V1 => Self::V1Legacy,
            ArgTemplateVersion::V2 => Self::V2Extended,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("packlist=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Generate(args) => {
            let l_paths = run_generate(&args)?;
            for path in l_paths {
                println!("{}", path.display());
            }
        }
        Command::Inspect { input, config } => {
            let options = load_options(config.as_deref())?;
            let v_bytes = read_input(&input)?;
            let inspection = inspect_workbook(&v_bytes, &options)?;
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Options from an optional JSON file; missing keys keep their defaults.
fn load_options(path: Option<&Path>) -> Result<SpecReportOptions> {
    let Some(path) = path else {
        return Ok(SpecReportOptions::default());
    };
    let c_json = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    serde_json::from_str(&c_json).with_context(|| format!("invalid config {}", path.display()))
}

fn derive_options(args: &GenerateArgs) -> Result<SpecReportOptions> {
    let mut options = load_options(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        options.output_mode = mode.into();
    }
    if let Some(version) = args.template_version {
        options.template_version = version.into();
    }
    if let Some(name) = &args.model_name {
        options.model_name = Some(name.clone());
    }
    if let Some(n_workers) = args.workers {
        options.num_workers_max = Some(n_workers);
    }
    Ok(options)
}

/// Generate, write artifacts and the validation report; returns the written paths.
fn run_generate(args: &GenerateArgs) -> Result<Vec<PathBuf>> {
    let options = derive_options(args)?;
    let v_bytes = read_input(&args.input)?;
    let v_template = args.template.as_deref().map(read_input).transpose()?;
    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let output = generate_reports(&v_bytes, &file_name, &options, v_template.as_deref())?;
    let mut l_paths = write_artifacts(&output, &args.out_dir)?;

    if let Some(path) = &args.validation_json {
        let c_json = serde_json::to_string_pretty(&output.validation)?;
        fs::write(path, c_json).with_context(|| format!("cannot write {}", path.display()))?;
        l_paths.push(path.clone());
    }
    if !output.validation.is_clean() {
        warn!(
            n_soft_issues = output.validation.soft_issues.len(),
            n_mismatches = output.validation.strict_mismatches.len(),
            "validation found issues"
        );
    }

    if let Some(path) = post_remote(args, &file_name, &v_bytes)? {
        l_paths.push(path);
    }

    info!("{}", output.report);
    Ok(l_paths)
}

/// Post the input to the remote endpoint; failures are logged, not fatal.
#[cfg(feature = "remote")]
fn post_remote(args: &GenerateArgs, file_name: &str, v_bytes: &[u8]) -> Result<Option<PathBuf>> {
    let Some(url) = &args.remote_url else {
        return Ok(None);
    };
    match packlist_report::post_generate_reports(url, file_name, v_bytes) {
        Ok(v_remote) => {
            let path = args.out_dir.join(format!(
                "{}Remote.xlsx",
                packlist_report::derive_base_name(file_name)
            ));
            fs::write(&path, v_remote).with_context(|| format!("cannot write {}", path.display()))?;
            Ok(Some(path))
        }
        Err(err) => {
            warn!(error = %err, "remote generation failed; local artifacts kept");
            Ok(None)
        }
    }
}

#[cfg(not(feature = "remote"))]
fn post_remote(_args: &GenerateArgs, _file_name: &str, _v_bytes: &[u8]) -> Result<Option<PathBuf>> {
    Ok(None)
}

fn write_artifacts(output: &SpecGenerateOutput, dir_out: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir_out)
        .with_context(|| format!("cannot create {}", dir_out.display()))?;
    output
        .artifacts
        .iter()
        .map(|artifact| {
            let path = dir_out.join(&artifact.file_name);
            fs::write(&path, &artifact.bytes)
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), n_sheets = artifact.sheet_names.len(), "wrote artifact");
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use packlist_io_xlsx::{EnumCellValue, SheetModel, SpecCellFormat, render_workbook};
    use packlist_report::TUP_HEADER_SIGNATURE;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("packlist_cli_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("scratch dir");
        dir
    }

    fn write_packing_list(path: &Path) {
        let mut sheet = SheetModel::new("PL");
        for (col, label) in TUP_HEADER_SIGNATURE.iter().enumerate() {
            sheet.set_value(4, col, *label);
        }
        for (idx, (carton, color)) in [("1", "Red"), ("", "Red"), ("2", "Blue")].iter().enumerate() {
            let row = 5 + idx;
            sheet.set_value(row, 0, *carton);
            sheet.set_value(row, 1, "4500777");
            sheet.set_value(row, 6, "X100");
            sheet.set_value(row, 7, *color);
            sheet.set_value(row, 9, EnumCellValue::Number(6.0));
            sheet.set_value(row, 11, EnumCellValue::Number(6.0));
        }
        let (v_bytes, _) =
            render_workbook(&[&sheet], SpecCellFormat::default()).expect("workbook renders");
        fs::write(path, v_bytes).expect("input written");
    }

    fn generate_args(input: PathBuf, out_dir: PathBuf) -> GenerateArgs {
        GenerateArgs {
            input,
            out_dir,
            mode: None,
            template: None,
            template_version: None,
            config: None,
            model_name: None,
            validation_json: None,
            workers: Some(1),
            #[cfg(feature = "remote")]
            remote_url: None,
        }
    }

    #[test]
    fn test_config_file_is_partial_and_flags_override() {
        let dir = scratch_dir("config");
        let path = dir.join("options.json");
        fs::write(&path, r#"{"output_mode": "separate", "weight_policy": "per_row"}"#)
            .expect("config written");

        let mut args = generate_args(dir.join("in.xlsx"), dir.clone());
        args.config = Some(path);
        args.template_version = Some(ArgTemplateVersion::V1);
        let options = derive_options(&args).expect("options load");

        assert_eq!(options.output_mode, EnumOutputMode::Separate);
        assert_eq!(options.template_version, EnumTemplateVersion::V1Legacy);
        assert_eq!(options.material_prefixes, vec!["X".to_string(), "L".to_string()]);
        assert_eq!(options.num_workers_max, Some(1));
    }

    #[test]
    fn test_generate_writes_artifacts_and_validation() {
        let dir = scratch_dir("generate");
        let input = dir.join("Shipment.xlsx");
        write_packing_list(&input);

        let mut args = generate_args(input, dir.join("out"));
        args.validation_json = Some(dir.join("validation.json"));
        let l_paths = run_generate(&args).expect("generate succeeds");

        assert!(dir.join("out/Shipment-4500777.xlsx").is_file());
        assert!(dir.join("out/ShipmentReport.xlsx").is_file());
        assert_eq!(l_paths.len(), 3);
        let c_json = fs::read_to_string(dir.join("validation.json")).expect("validation written");
        assert!(c_json.contains("strictMismatches"));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = scratch_dir("missing");
        let args = generate_args(dir.join("nope.xlsx"), dir.clone());
        let err = run_generate(&args).expect_err("missing input fails");
        assert!(err.to_string().contains("nope.xlsx"));
    }
}

// Command line front end for the prescription analyzer

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::error;

use rxscan::{
    models::{AnalysisResponse, AnalysisResult},
    AnalyzerConfig, AnalyzerError, PrescriptionAnalyzer, UploadPolicy,
};

#[derive(Parser)]
#[command(name = "rxscan")]
#[command(about = "Extract structured data from photographed prescriptions")]
#[command(version)]
struct Cli {
    /// JSON file with analyzer settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding Tesseract language data
    #[arg(long, global = true)]
    tessdata: Option<String>,

    /// OCR language code
    #[arg(long, global = true)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a prescription image
    Analyze {
        image: PathBuf,
        /// Print the JSON response instead of the report
        #[arg(long)]
        json: bool,
    },
    /// Run extraction on an already transcribed text file
    Text {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List OCR engines and knowledge base status
    Engines,
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig, AnalyzerError> {
    let config = match &cli.config {
        Some(path) => AnalyzerConfig::from_file(path)?,
        None => AnalyzerConfig::default(),
    };
    let mut config = config.with_env();
    if let Some(dir) = &cli.tessdata {
        config.tessdata_dir = Some(dir.clone());
    }
    if let Some(lang) = &cli.lang {
        config.language = lang.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_detailed_report(result: &AnalysisResult) {
    println!("\n===============================================");
    println!("        PRESCRIPTION ANALYSIS REPORT");
    println!("===============================================\n");

    println!("Prescription ID: {}", result.prescription_id);
    println!("Analyzed at: {}", result.timestamp);
    println!("Status: {}", if result.success { "SUCCESS" } else { "FAILED" });
    if !result.success {
        println!("Error: {}", result.error);
        return;
    }

    println!("\nPATIENT:");
    println!("  Name: {}", result.patient.name);
    println!("  Age: {}", result.patient.age);
    println!("  Gender: {}", result.patient.gender);

    println!("\nDOCTOR:");
    println!("  Name: {}", result.doctor.name);
    println!("  Specialization: {}", result.doctor.specialization);
    println!("  Registration No: {}", result.doctor.registration_number);

    println!("\nMEDICINES:");
    if result.medicines.is_empty() {
        println!("  (none found)");
    }
    for (i, medicine) in result.medicines.iter().enumerate() {
        println!(
            "  {}. {} [{}] confidence {:.2}",
            i + 1,
            medicine.name,
            medicine.extraction_method.as_str(),
            medicine.confidence
        );
        if !medicine.generic.is_empty() {
            println!("     Generic: {} ({})", medicine.generic, medicine.category);
        }
        println!("     Dosage: {}", medicine.dosage);
        println!("     Frequency: {}", medicine.frequency);
        println!("     Duration: {}", medicine.duration);
    }

    if !result.diagnosis.is_empty() {
        println!("\nDIAGNOSIS:");
        for condition in &result.diagnosis {
            println!("  - {}", condition);
        }
    }

    println!("\nOverall confidence: {:.1}%", result.confidence_score * 100.0);
}

fn emit(result: &AnalysisResult, json: bool) -> Result<(), AnalyzerError> {
    if json {
        println!("{}", AnalysisResponse::from(result).to_json_pretty()?);
    } else {
        print_detailed_report(result);
    }
    Ok(())
}

fn analyze_image(analyzer: &PrescriptionAnalyzer, image: &Path, json: bool) -> Result<bool, AnalyzerError> {
    UploadPolicy::default().validate_file(image)?;
    let result = analyzer.analyze(image);
    emit(&result, json)?;
    Ok(result.success)
}

fn run(cli: Cli) -> Result<bool, AnalyzerError> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Analyze { image, json } => {
            let analyzer = PrescriptionAnalyzer::new(config);
            analyze_image(&analyzer, &image, json)
        }
        Commands::Text { file, json } => {
            let text = std::fs::read_to_string(&file)?;
            let analyzer = PrescriptionAnalyzer::with_engines(config, Vec::new());
            let result = analyzer.analyze_text(&text, 1.0);
            emit(&result, json)?;
            Ok(result.success)
        }
        Commands::Engines => {
            let analyzer = PrescriptionAnalyzer::new(config);
            let capabilities = analyzer.capabilities();
            println!("{}", serde_json::to_string_pretty(&capabilities)?);
            Ok(!capabilities.available_engines.is_empty())
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            error!("{}", err);
            eprintln!("Error: {}", err);
            process::exit(2);
        }
    }
}

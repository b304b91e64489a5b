//! PoK CLI - Command-line interface for Efforia proof-of-keystrokes
//!
//! Commands:
//! - certify: Turn an exported session into a certificate
//! - validate: Check a session file against the telemetry schema
//! - features: Show the normalized features and fingerprint pre-image
//! - verify: Check a certificate against its session and a local ledger
//! - anchor: Record a certificate in a local ledger file
//! - schema: Print the session or certificate schema

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use efforia_pok::anchor::{AnchorLedger, AnchorRequest, InMemoryLedger};
use efforia_pok::fingerprint::{fingerprint_hash, fingerprint_payload};
use efforia_pok::types::{Certificate, NormalizedFeatures};
use efforia_pok::verify::{validate_certificate, verify};
use efforia_pok::{
    parse_session, AnchorError, CertificateError, CertificateProcessor, Normalizer, PokError,
    ScoringConfig, DEFAULT_CERTIFICATE_FILE, DEFAULT_SESSION_FILE, POK_VERSION, SCORE_VERSION,
};

/// PoK - proof-of-keystrokes certificates for human authorship
#[derive(Parser)]
#[command(name = "pok")]
#[command(author = "Efforia")]
#[command(version = POK_VERSION)]
#[command(about = "Issue and verify human-effort certificates", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn an exported session into a certificate
    Certify {
        /// Session file path (use - for stdin)
        #[arg(short, long, default_value = DEFAULT_SESSION_FILE)]
        input: PathBuf,

        /// Certificate file path (use - for stdout)
        #[arg(short, long, default_value = DEFAULT_CERTIFICATE_FILE)]
        output: PathBuf,

        /// Author address recorded on the certificate
        #[arg(long)]
        author: Option<String>,

        /// Omit the per-heuristic score breakdown
        #[arg(long)]
        no_breakdown: bool,

        /// Load scoring constants from a JSON file
        #[arg(long)]
        scoring_config: Option<PathBuf>,
    },

    /// Check a session file against the telemetry schema
    Validate {
        /// Session file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the normalized features and fingerprint pre-image
    Features {
        /// Session file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a certificate, optionally against its session and a ledger
    Verify {
        /// Certificate file path (use - for stdin)
        #[arg(short, long)]
        certificate: PathBuf,

        /// Session the certificate claims to describe
        #[arg(short, long)]
        session: Option<PathBuf>,

        /// Local ledger file to look the fingerprint up in
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a certificate in a local ledger file
    Anchor {
        /// Certificate file path (use - for stdin)
        #[arg(short, long)]
        certificate: PathBuf,

        /// Ledger file (created if missing)
        #[arg(long)]
        ledger: PathBuf,

        /// Address credited with the anchor
        #[arg(long)]
        author: String,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Session telemetry exported by the capture component
    Input,
    /// Proof-of-keystrokes certificate
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    // Only fails if a subscriber is already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: Cli) -> Result<(), PokCliError> {
    match cli.command {
        Commands::Certify {
            input,
            output,
            author,
            no_breakdown,
            scoring_config,
        } => cmd_certify(
            &input,
            &output,
            author,
            !no_breakdown,
            scoring_config.as_deref(),
        ),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Features { input, json } => cmd_features(&input, json),
        Commands::Verify {
            certificate,
            session,
            ledger,
            json,
        } => cmd_verify(&certificate, session.as_deref(), ledger.as_deref(), json),
        Commands::Anchor {
            certificate,
            ledger,
            author,
        } => cmd_anchor(&certificate, &ledger, &author),
        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(path: &Path) -> Result<String, PokCliError> {
    if is_stdio(path) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn read_certificate(path: &Path) -> Result<Certificate, PokCliError> {
    Ok(serde_json::from_str(&read_input(path)?)?)
}

fn cmd_certify(
    input: &Path,
    output: &Path,
    author: Option<String>,
    include_breakdown: bool,
    scoring_config: Option<&Path>,
) -> Result<(), PokCliError> {
    let mut processor = match scoring_config {
        Some(path) => {
            let config = ScoringConfig::from_json(&fs::read_to_string(path)?)?;
            CertificateProcessor::with_config(config)?
        }
        None => CertificateProcessor::new(),
    };
    processor = processor.breakdown(include_breakdown);
    if let Some(author) = author {
        processor = processor.author(author);
    }

    let session = parse_session(&read_input(input)?)?;
    let certificate = processor.certify(&session);
    let rendered = serde_json::to_string_pretty(&certificate)?;

    if is_stdio(output) {
        println!("{}", rendered);
        return Ok(());
    }

    fs::write(output, format!("{}\n", rendered))?;
    tracing::info!(path = %output.display(), "certificate written");

    println!("Certificate written to {}", output.display());
    println!("  Fingerprint: {}", certificate.fingerprint_hash);
    println!("  Score:       {}", certificate.human_effort_score);
    println!("  Confidence:  {}", certificate.confidence_level);
    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), PokCliError> {
    let report = match parse_session(&read_input(input)?) {
        Ok(session) => ValidationReport {
            valid: true,
            error: None,
            keystroke_samples: session.keystrokes.len(),
            paste_buckets: session.paste_buckets.len(),
        },
        Err(PokError::JsonError(e)) => return Err(e.into()),
        Err(e) => ValidationReport {
            valid: false,
            error: Some(e.to_string()),
            keystroke_samples: 0,
            paste_buckets: 0,
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Valid:             {}", report.valid);
        println!("Keystroke samples: {}", report.keystroke_samples);
        println!("Paste buckets:     {}", report.paste_buckets);
        if let Some(error) = &report.error {
            println!("\nError: {}", error);
        }
    }

    match report.error {
        Some(error) => Err(PokCliError::ValidationFailed(error)),
        None => Ok(()),
    }
}

fn cmd_features(input: &Path, json: bool) -> Result<(), PokCliError> {
    let session = parse_session(&read_input(input)?)?;
    let features = Normalizer::normalize(&session);
    let report = FeaturesReport {
        payload: fingerprint_payload(&features),
        fingerprint_hash: fingerprint_hash(&features),
        features,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let f = &report.features;
        println!("Normalized Features");
        println!("===================");
        println!("Total keystrokes:       {}", f.total_keystrokes);
        println!("Mean interval (ms):     {}", f.mean_keystroke_interval);
        println!(
            "Edit ops (ins/del/rep): {}/{}/{}",
            f.insert_count, f.delete_count, f.replace_count
        );
        println!("Pastes:                 {}", f.paste_count);
        println!("Long paste ratio:       {}", f.paste_long_bucket_ratio);
        println!("Active ratio:           {}", f.active_ratio);
        println!("Duration (s):           {}", f.session_duration_seconds);
        println!("Files changed:          {}", f.file_change_count);
        println!();
        println!("Payload:     {}", report.payload);
        println!("Fingerprint: {}", report.fingerprint_hash);
    }
    Ok(())
}

fn cmd_verify(
    certificate: &Path,
    session: Option<&Path>,
    ledger: Option<&Path>,
    json: bool,
) -> Result<(), PokCliError> {
    let certificate = read_certificate(certificate)?;
    let session = session
        .map(|path| -> Result<_, PokCliError> { Ok(parse_session(&read_input(path)?)?) })
        .transpose()?;
    let ledger = ledger
        .map(|path| -> Result<_, PokCliError> {
            Ok(InMemoryLedger::from_json(&fs::read_to_string(path)?)?)
        })
        .transpose()?;

    let result = verify(
        &certificate,
        session.as_ref(),
        ledger.as_ref().map(|l| l as &dyn AnchorLedger),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Verification Report");
        println!("===================");
        println!("Valid:       {}", result.valid);
        println!("Message:     {}", result.message);
        println!("Fingerprint: {}", result.certificate.fingerprint_hash);
        println!("Score:       {}", result.certificate.human_effort_score);
        println!("Confidence:  {}", result.certificate.confidence_level);
        if let Some(anchored) = &result.anchored {
            match (&anchored.author, anchored.score, anchored.timestamp) {
                (Some(author), Some(score), Some(ts)) => {
                    println!("Anchored:    score {} by {} at {}", score, author, ts)
                }
                _ => println!("Anchored:    no"),
            }
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err(PokCliError::VerificationFailed(result.message))
    }
}

fn cmd_anchor(certificate: &Path, ledger_path: &Path, author: &str) -> Result<(), PokCliError> {
    let certificate = read_certificate(certificate)?;
    validate_certificate(&certificate)?;
    let request = AnchorRequest::from_certificate(&certificate)?;

    let mut ledger = if ledger_path.exists() {
        InMemoryLedger::from_json(&fs::read_to_string(ledger_path)?)?
    } else {
        InMemoryLedger::new()
    };

    ledger.anchor(&request, author, Utc::now())?;
    fs::write(ledger_path, format!("{}\n", ledger.to_json()?))?;

    println!("Anchored {}", request.key_hex());
    println!("  Score:  {}", request.score);
    println!("  Author: {}", author);
    println!("  Ledger: {} ({} entries)", ledger_path.display(), ledger.len());
    Ok(())
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), PokCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&input_json_schema())?);
            } else {
                println!("Input: session telemetry ({})", DEFAULT_SESSION_FILE);
                println!();
                println!("- sessionStart, sessionEnd: ISO 8601 timestamps");
                println!("- keystrokes: [{{ count, meanIntervalMs, varianceBucket }}]");
                println!("- editOps: {{ insert, delete, replace }}");
                println!("- pasteBuckets: [{{ bucket: 0-50 | 51-200 | 201-500 | 501+, count }}]");
                println!("- idleActive: {{ activeSeconds, idleSeconds }}");
                println!("- fileChangeCount: optional, defaults to 0");
                println!();
                println!("No source text, file names or individual key events are accepted.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&output_json_schema())?);
            } else {
                println!("Output: proof-of-keystrokes certificate ({})", SCORE_VERSION);
                println!();
                println!("- fingerprint_hash: SHA-256 of the normalized features (64 hex)");
                println!("- human_effort_score: 0..1, 3 decimals");
                println!("- confidence_level: low | medium | high");
                println!("- timestamp: generation time (RFC 3339)");
                println!("- author_address: optional");
                println!("- session_duration_seconds: optional");
                println!("- score_breakdown: optional per-heuristic sub-scores");
                println!("- score_version: scoring constants used");
            }
        }
    }

    Ok(())
}

fn input_json_schema() -> serde_json::Value {
    let number = json!({ "type": "number" });
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "SessionTelemetry",
        "type": "object",
        "required": ["sessionStart", "sessionEnd", "keystrokes", "editOps", "pasteBuckets", "idleActive"],
        "properties": {
            "sessionStart": { "type": "string", "format": "date-time" },
            "sessionEnd": { "type": "string", "format": "date-time" },
            "keystrokes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["count", "meanIntervalMs"],
                    "properties": {
                        "count": number,
                        "meanIntervalMs": number,
                        "varianceBucket": { "type": "integer" }
                    }
                }
            },
            "editOps": {
                "type": "object",
                "required": ["insert", "delete", "replace"],
                "properties": { "insert": number, "delete": number, "replace": number }
            },
            "pasteBuckets": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "bucket": { "enum": ["0-50", "51-200", "201-500", "501+"] },
                        "count": number
                    }
                }
            },
            "idleActive": {
                "type": "object",
                "required": ["activeSeconds", "idleSeconds"],
                "properties": { "activeSeconds": number, "idleSeconds": number }
            },
            "fileChangeCount": number
        }
    })
}

fn output_json_schema() -> serde_json::Value {
    let unit = json!({ "type": "number", "minimum": 0, "maximum": 1 });
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "PoKCertificate",
        "type": "object",
        "required": ["fingerprint_hash", "human_effort_score", "confidence_level", "timestamp"],
        "properties": {
            "fingerprint_hash": { "type": "string", "pattern": "^[0-9a-fA-F]{64}$" },
            "human_effort_score": unit,
            "confidence_level": { "enum": ["low", "medium", "high"] },
            "timestamp": { "type": "string", "minLength": 1 },
            "author_address": { "type": "string" },
            "session_duration_seconds": { "type": "integer", "minimum": 0 },
            "score_breakdown": {
                "type": "object",
                "properties": {
                    "keystrokes": unit,
                    "pace": unit,
                    "editDiversity": unit,
                    "lowPaste": unit,
                    "activeRatio": unit,
                    "duration": unit
                }
            },
            "score_version": { "type": "string" }
        }
    })
}

// Error types

enum PokCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Pok(PokError),
    Certificate(CertificateError),
    Anchor(AnchorError),
    ValidationFailed(String),
    VerificationFailed(String),
}

impl From<io::Error> for PokCliError {
    fn from(e: io::Error) -> Self {
        PokCliError::Io(e)
    }
}

impl From<serde_json::Error> for PokCliError {
    fn from(e: serde_json::Error) -> Self {
        PokCliError::Json(e)
    }
}

impl From<PokError> for PokCliError {
    fn from(e: PokError) -> Self {
        match e {
            PokError::JsonError(e) => PokCliError::Json(e),
            PokError::Certificate(e) => PokCliError::Certificate(e),
            PokError::Anchor(e) => PokCliError::Anchor(e),
            other => PokCliError::Pok(other),
        }
    }
}

impl From<CertificateError> for PokCliError {
    fn from(e: CertificateError) -> Self {
        PokCliError::Certificate(e)
    }
}

impl From<AnchorError> for PokCliError {
    fn from(e: AnchorError) -> Self {
        PokCliError::Anchor(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PokCliError> for CliError {
    fn from(e: PokCliError) -> Self {
        match e {
            PokCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PokCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PokCliError::Pok(e @ PokError::Schema(_)) => CliError {
                code: "SCHEMA_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pok schema input' for the expected format".to_string()),
            },
            PokCliError::Pok(e @ PokError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Weights must sum to 1.0 and the pace band must be ordered".to_string()),
            },
            PokCliError::Pok(e) => CliError {
                code: "POK_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PokCliError::Certificate(e) => CliError {
                code: "CERTIFICATE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pok schema output' for the expected format".to_string()),
            },
            PokCliError::Anchor(e @ AnchorError::AlreadyAnchored) => CliError {
                code: "ALREADY_ANCHORED".to_string(),
                message: e.to_string(),
                hint: Some("Use 'pok verify --ledger' to inspect the existing anchor".to_string()),
            },
            PokCliError::Anchor(e) => CliError {
                code: "ANCHOR_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PokCliError::ValidationFailed(msg) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: msg,
                hint: Some("Fix the session export and retry".to_string()),
            },
            PokCliError::VerificationFailed(msg) => CliError {
                code: "VERIFICATION_FAILED".to_string(),
                message: msg,
                hint: Some("The certificate does not belong to this session or ledger".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    valid: bool,
    error: Option<String>,
    keystroke_samples: usize,
    paste_buckets: usize,
}

#[derive(serde::Serialize)]
struct FeaturesReport {
    features: NormalizedFeatures,
    payload: String,
    fingerprint_hash: String,
}

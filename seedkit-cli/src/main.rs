//! Developer CLI for `SeedKit`.
//!
//! Drives the password backup codec and the device-bound codec from a terminal. The device
//! codec keeps its key pair in the OS credential store and asks for confirmation on the
//! terminal before every private key operation.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use seedkit_core::backup::PasswordBackupCodec;
use seedkit_core::device::{
    AlwaysApprove, HardwareBoundCodec, HardwareCodecConfig, KeyringKeyStore, PresenceOutcome,
    PresenceVerifier, DEFAULT_APPLICATION_TAG, DEFAULT_KEYRING_SERVICE,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seedkit", version)]
#[command(about = "Encrypt a seed phrase with a password or a device-bound key", long_about = None)]
struct Cli {
    /// Print and read ciphertexts as hex instead of base64
    #[arg(long, global = true)]
    hex: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Password-protected backups
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Device-bound encryption with a key held in the OS credential store
    Device {
        #[command(flatten)]
        args: DeviceArgs,

        #[command(subcommand)]
        command: DeviceCommand,
    },
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Seal a text under a password
    Encrypt {
        /// Backup password
        #[arg(long, env = "SEEDKIT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Text to seal
        text: String,
    },

    /// Open a sealed backup
    Decrypt {
        /// Backup password
        #[arg(long, env = "SEEDKIT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Sealed backup (base64, or hex with --hex)
        ciphertext: String,
    },
}

#[derive(Args)]
struct DeviceArgs {
    /// Tag the key pair is stored under
    #[arg(long, env = "SEEDKIT_APPLICATION_TAG", default_value = DEFAULT_APPLICATION_TAG)]
    application_tag: String,

    /// Credential store service name
    #[arg(long, env = "SEEDKIT_KEYRING_SERVICE", default_value = DEFAULT_KEYRING_SERVICE)]
    keyring_service: String,

    /// Approve private key use without asking
    #[arg(short, long)]
    yes: bool,
}

#[derive(Subcommand)]
enum DeviceCommand {
    /// Encrypt a text to the device key pair
    Encrypt {
        /// Text to encrypt
        text: String,
    },

    /// Decrypt a ciphertext with the device key pair
    Decrypt {
        /// Ciphertext (base64, or hex with --hex)
        ciphertext: String,
    },

    /// Print the public key as uncompressed SEC1 hex
    PublicKey,

    /// Delete the key pair. Existing ciphertexts become unrecoverable.
    DeleteKey,
}

/// Presence check answered on the terminal.
struct TerminalPresenceVerifier;

impl PresenceVerifier for TerminalPresenceVerifier {
    fn verify(&self, reason: &str) -> PresenceOutcome {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "{reason}. Continue? [y/N] ")
            .and_then(|()| stderr.flush())
            .is_err()
        {
            return PresenceOutcome::Cancelled;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => PresenceOutcome::Cancelled,
            Ok(_) if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") => {
                PresenceOutcome::Approved
            }
            Ok(_) => PresenceOutcome::Denied,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let output = Output { hex: cli.hex };

    match cli.command {
        Command::Backup(command) => run_backup(command, output),
        Command::Device { args, command } => run_device(&args, command, output),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SEEDKIT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[derive(Clone, Copy)]
struct Output {
    hex: bool,
}

impl Output {
    fn encode(self, bytes: &[u8]) -> String {
        if self.hex {
            hex::encode(bytes)
        } else {
            STANDARD.encode(bytes)
        }
    }

    fn decode(self, text: &str) -> Result<Vec<u8>> {
        let text = text.trim();
        if self.hex {
            hex::decode(text).wrap_err("ciphertext is not valid hex")
        } else {
            STANDARD
                .decode(text)
                .wrap_err("ciphertext is not valid base64")
        }
    }
}

fn run_backup(command: BackupCommand, output: Output) -> Result<()> {
    let codec = PasswordBackupCodec::new();
    match command {
        BackupCommand::Encrypt { password, text } => {
            let sealed = codec
                .encrypt(&text, &password)
                .wrap_err("failed to seal backup")?;
            println!("{}", output.encode(&sealed));
        }
        BackupCommand::Decrypt {
            password,
            ciphertext,
        } => {
            let sealed = output.decode(&ciphertext)?;
            let clear_text = codec
                .decrypt(&sealed, &password)
                .wrap_err("failed to open backup")?;
            println!("{clear_text}");
        }
    }
    Ok(())
}

fn run_device(args: &DeviceArgs, command: DeviceCommand, output: Output) -> Result<()> {
    let store = Arc::new(KeyringKeyStore::with_service(&args.keyring_service));
    let verifier: Arc<dyn PresenceVerifier> = if args.yes {
        Arc::new(AlwaysApprove)
    } else {
        Arc::new(TerminalPresenceVerifier)
    };
    let config = HardwareCodecConfig::with_tag(&args.application_tag);
    tracing::debug!(
        tag = %config.application_tag,
        service = %args.keyring_service,
        "opening device codec"
    );

    let codec = HardwareBoundCodec::initialize(store, verifier, config)
        .wrap_err("failed to provision device key pair")?;

    match command {
        DeviceCommand::Encrypt { text } => {
            let blob = codec.encrypt(&text).wrap_err("failed to encrypt")?;
            println!("{}", output.encode(&blob));
        }
        DeviceCommand::Decrypt { ciphertext } => {
            let blob = output.decode(&ciphertext)?;
            let clear_text = codec.decrypt(&blob).wrap_err("failed to decrypt")?;
            println!("{clear_text}");
        }
        DeviceCommand::PublicKey => {
            println!("{}", hex::encode(codec.public_key_sec1()?));
        }
        DeviceCommand::DeleteKey => {
            codec
                .delete_key_pair()
                .wrap_err("failed to delete key pair")?;
            eprintln!("key pair deleted");
        }
    }
    Ok(())
}

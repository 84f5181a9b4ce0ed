//! Key command to manage the peer identity.

use clap::{Args, Subcommand};
use dr_types::Keypair;
use eyre::{eyre, Context as _};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Generate or inspect the identity used to sign provider advertisements.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
pub struct KeyArgs {
    /// The key operation.
    #[command(subcommand)]
    pub command: KeySubcommand,
}

/// Subcommand to either generate a key or read its peer id.
#[derive(Debug, Clone, Subcommand)]
pub enum KeySubcommand {
    /// Generate an ed25519 identity and write it to file.
    #[command(name = "generate")]
    Generate(GenerateArgs),

    /// Print the peer id of an identity file.
    #[command(name = "peer-id")]
    PeerId(KeyFileArgs),
}

/// Arguments for generating a new identity.
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub key: KeyFileArgs,

    /// Overwrite an existing identity.
    ///
    /// Warning: the existing key will be lost.
    #[arg(long = "force", alias = "overwrite", verbatim_doc_comment)]
    pub force: bool,
}

/// Location of the identity file.
#[derive(Debug, Clone, Args)]
pub struct KeyFileArgs {
    /// Path of the protobuf encoded identity.
    #[arg(long, value_name = "KEY_FILE", default_value = "identity.key")]
    pub key_file: PathBuf,
}

impl KeyArgs {
    /// Execute command
    pub fn execute(&self) -> eyre::Result<()> {
        match &self.command {
            KeySubcommand::Generate(args) => {
                let path = &args.key.key_file;
                if path.exists() && !args.force {
                    warn!(target: "dr::keytool", ?path, "pass `force` to overwrite the identity");
                    return Err(eyre!("cannot overwrite {} without passing --force", path.display()));
                }
                let keypair = Keypair::generate_ed25519();
                write_keypair(path, &keypair)?;
                info!(target: "dr::keytool", ?path, peer = %keypair.public().to_peer_id(), "identity generated");
                println!("{}", keypair.public().to_peer_id());
            }
            KeySubcommand::PeerId(args) => {
                let keypair = read_keypair(&args.key_file)?;
                println!("{}", keypair.public().to_peer_id());
            }
        }
        Ok(())
    }
}

/// Read an identity written by [write_keypair].
pub fn read_keypair(path: impl AsRef<Path>) -> eyre::Result<Keypair> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .wrap_err_with(|| format!("failed to read identity {}", path.display()))?;
    Keypair::from_protobuf_encoding(&bytes)
        .wrap_err_with(|| format!("invalid identity {}", path.display()))
}

/// Write the protobuf encoding of `keypair`, creating parent directories.
pub fn write_keypair(path: impl AsRef<Path>, keypair: &Keypair) -> eyre::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).wrap_err_with(|| {
            format!("could not create identity directory {}", parent.display())
        })?;
    }
    let bytes = keypair.to_protobuf_encoding()?;
    std::fs::write(path, bytes)
        .wrap_err_with(|| format!("failed to write identity {}", path.display()))
}

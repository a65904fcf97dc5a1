//! coffer CLI - Command line interface for encrypted secret vaults.
//!
//! A vault is a single container file. Every command unlocks it, applies at
//! most one change, and writes the re-encrypted container back in place.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use coffer_common::GroupPath;
use coffer_vault::{Entry, Group, Node, Vault, VaultConfig};

/// Environment variable consulted before prompting for a passphrase.
const PASSPHRASE_ENV: &str = "COFFER_PASSPHRASE";

const MASK: &str = "********";

#[derive(Parser)]
#[command(name = "coffer")]
#[command(about = "coffer - Encrypted secret vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// JSON file with vault configuration (scrypt parameters for new vaults,
    /// retention of deleted nodes).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vault file.
    Create {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Show the contents of a group.
    List {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,

        /// Group to list (default: root).
        #[arg(short, long, default_value = "/")]
        group: String,

        /// Show secret contents instead of masking them.
        #[arg(long)]
        reveal: bool,

        /// Include deleted groups and entries.
        #[arg(short, long)]
        all: bool,
    },

    /// Add a group.
    AddGroup {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,

        /// Parent group (default: root).
        #[arg(short, long, default_value = "/")]
        group: String,

        /// Label of the new group.
        #[arg(short, long)]
        label: String,

        /// Optional description.
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Add an entry.
    AddEntry {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,

        /// Group to add the entry to (default: root).
        #[arg(short, long, default_value = "/")]
        group: String,

        /// Label of the new entry.
        #[arg(short, long)]
        label: String,

        /// Entry content. Prompted for without echo when omitted.
        #[arg(short, long)]
        content: Option<String>,

        /// Mark the content as secret.
        #[arg(short, long)]
        secret: bool,
    },

    /// Search group labels and descriptions.
    Search {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,

        /// Words to match as prefixes, in any order.
        phrase: String,
    },

    /// Soft-delete a group or an entry.
    Delete {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,

        /// Group to delete, or the group holding the entry.
        #[arg(short, long)]
        group: String,

        /// Entry to delete inside the group.
        #[arg(short, long)]
        entry: Option<String>,
    },

    /// Undo a soft delete.
    Restore {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,

        /// Group to restore, or the group holding the entry.
        #[arg(short, long)]
        group: String,

        /// Entry to restore inside the group.
        #[arg(short, long)]
        entry: Option<String>,
    },

    /// Change fields of a group or an entry.
    Set {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,

        /// Group to change, or the group holding the entry.
        #[arg(short, long, default_value = "/")]
        group: String,

        /// Entry to change inside the group.
        #[arg(short, long)]
        entry: Option<String>,

        /// New label.
        #[arg(long)]
        label: Option<String>,

        /// New content (entries only).
        #[arg(long)]
        content: Option<String>,

        /// New secret flag (entries only).
        #[arg(long)]
        secret: Option<bool>,

        /// New description (groups only).
        #[arg(long)]
        description: Option<String>,
    },

    /// Change the vault passphrase.
    ChangePassphrase {
        /// Path of the container file.
        #[arg(short, long)]
        path: PathBuf,
    },
}

/// A node to delete, restore or change.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    group: GroupPath,
    entry: Option<String>,
}

impl Target {
    fn parse(group: &str, entry: Option<String>) -> Result<Self> {
        let group = GroupPath::parse(group).context("Invalid group path")?;
        Ok(Self { group, entry })
    }

    fn describe(&self) -> String {
        match &self.entry {
            Some(entry) if self.group.is_root() => format!("/{}", entry),
            Some(entry) => format!("{}/{}", self.group, entry),
            None => self.group.to_string(),
        }
    }
}

/// Field changes requested by `set`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Changes {
    label: Option<String>,
    content: Option<String>,
    secret: Option<bool>,
    description: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Create { path } => cmd_create(&path, config),

        Commands::List {
            path,
            group,
            reveal,
            all,
        } => cmd_list(&path, &config, &group, reveal, all),

        Commands::AddGroup {
            path,
            group,
            label,
            description,
        } => cmd_add_group(&path, &config, &group, &label, description),

        Commands::AddEntry {
            path,
            group,
            label,
            content,
            secret,
        } => cmd_add_entry(&path, &config, &group, &label, content, secret),

        Commands::Search { path, phrase } => cmd_search(&path, &config, &phrase),

        Commands::Delete { path, group, entry } => {
            cmd_mark(&path, &config, &Target::parse(&group, entry)?, true)
        }

        Commands::Restore { path, group, entry } => {
            cmd_mark(&path, &config, &Target::parse(&group, entry)?, false)
        }

        Commands::Set {
            path,
            group,
            entry,
            label,
            content,
            secret,
            description,
        } => {
            let changes = Changes {
                label,
                content,
                secret,
                description,
            };
            cmd_set(&path, &config, &Target::parse(&group, entry)?, &changes)
        }

        Commands::ChangePassphrase { path } => cmd_change_passphrase(&path, &config),
    }
}

/// Read the passphrase from the environment or prompt for it securely.
fn read_passphrase(prompt: &str) -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }
    rpassword::prompt_password(prompt).context("Failed to read passphrase")
}

/// Prompt twice for a new passphrase.
fn read_new_passphrase() -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }
    let passphrase = rpassword::prompt_password("Enter new passphrase: ")
        .context("Failed to read passphrase")?;
    let confirm = rpassword::prompt_password("Confirm new passphrase: ")
        .context("Failed to read passphrase")?;

    if passphrase != confirm {
        anyhow::bail!("Passphrases do not match");
    }
    Ok(passphrase)
}

fn load_config(path: Option<&Path>) -> Result<VaultConfig> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            VaultConfig::from_json(&json).context("Invalid vault configuration")
        }
        None => Ok(VaultConfig::default()),
    }
}

/// Unlock the vault at `path`. Edits purge deletions older than `config`'s retention.
fn open_vault(path: &Path, passphrase: &str, config: &VaultConfig) -> Result<Vault> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Vault::unlock_with_config(passphrase, &bytes, config.clone()).context("Failed to unlock vault")
}

/// Export the vault and replace the file at `path`.
///
/// The container is written to a sibling file first and renamed over the
/// target, so a crash never leaves a truncated vault behind.
fn save_vault(path: &Path, vault: &mut Vault) -> Result<()> {
    let bytes = vault.export().context("Failed to export vault")?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, &bytes)
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn create_vault(path: &Path, passphrase: &str, config: VaultConfig) -> Result<Vault> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    if passphrase.is_empty() {
        anyhow::bail!("Passphrase cannot be empty");
    }

    let mut vault =
        Vault::create_with_config(passphrase, config).context("Failed to create vault")?;
    save_vault(path, &mut vault)?;
    Ok(vault)
}

fn add_group(vault: &mut Vault, parent: &str, label: &str, description: Option<String>) -> Result<()> {
    let parent = GroupPath::parse(parent).context("Invalid group path")?;
    vault
        .edit(|root| {
            root.find_group_mut(&parent)?.add_group(label, description)?;
            Ok(())
        })
        .context("Failed to add group")
}

fn add_entry(vault: &mut Vault, group: &str, label: &str, content: &str, secret: bool) -> Result<()> {
    let group = GroupPath::parse(group).context("Invalid group path")?;
    vault
        .edit(|root| {
            root.find_group_mut(&group)?.add_entry(label, content, secret)?;
            Ok(())
        })
        .context("Failed to add entry")
}

/// Soft-delete (`deleted = true`) or restore the target.
fn mark(vault: &mut Vault, target: &Target, deleted: bool) -> Result<()> {
    if target.entry.is_none() && target.group.is_root() {
        anyhow::bail!("The root group cannot be deleted or restored");
    }

    vault
        .edit(|root| {
            match &target.entry {
                Some(label) => {
                    let entry = root.find_entry_mut(&target.group, label)?;
                    if deleted {
                        entry.mark_deleted();
                    } else {
                        entry.restore();
                    }
                }
                None => {
                    let group = root.find_group_mut(&target.group)?;
                    if deleted {
                        group.mark_deleted();
                    } else {
                        group.restore();
                    }
                }
            }
            Ok(())
        })
        .with_context(|| format!("Failed to update {}", target.describe()))
}

fn apply_changes(vault: &mut Vault, target: &Target, changes: &Changes) -> Result<()> {
    match &target.entry {
        Some(_) if changes.description.is_some() => {
            anyhow::bail!("Entries have no description")
        }
        None if changes.content.is_some() || changes.secret.is_some() => {
            anyhow::bail!("Groups have no content or secret flag")
        }
        _ => {}
    }
    if *changes == Changes::default() {
        anyhow::bail!("Nothing to change");
    }

    vault
        .edit(|root| {
            match &target.entry {
                Some(label) => {
                    let entry = root.find_entry_mut(&target.group, label)?;
                    if let Some(content) = &changes.content {
                        entry.set_content(content.as_str())?;
                    }
                    if let Some(secret) = changes.secret {
                        entry.set_secret(secret);
                    }
                    if let Some(label) = &changes.label {
                        entry.set_label(label.as_str())?;
                    }
                }
                None => {
                    let group = root.find_group_mut(&target.group)?;
                    if let Some(description) = &changes.description {
                        let description = Some(description.clone()).filter(|d| !d.is_empty());
                        group.set_description(description)?;
                    }
                    if let Some(label) = &changes.label {
                        group.set_label(label.as_str())?;
                    }
                }
            }
            Ok(())
        })
        .with_context(|| format!("Failed to update {}", target.describe()))
}

fn render_entry(entry: &Entry, reveal: bool) -> String {
    let content = if entry.secret() && !reveal {
        MASK
    } else {
        entry.content()
    };
    format!("{}: {}", entry.label(), content)
}

fn deleted_suffix(node: &Node) -> &'static str {
    if node.is_deleted() {
        " (deleted)"
    } else {
        ""
    }
}

/// Render a group's subtree, one node per line, indented by depth.
fn render_group(group: &Group, reveal: bool, all: bool) -> Vec<String> {
    let mut lines = Vec::new();
    render_into(group, reveal, all, 1, &mut lines);
    lines
}

fn render_into(group: &Group, reveal: bool, all: bool, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in group.entries() {
        if node.is_deleted() && !all {
            continue;
        }
        match node {
            Node::Group(child) => {
                let description = child
                    .description()
                    .map(|d| format!(" - {}", d))
                    .unwrap_or_default();
                lines.push(format!(
                    "{}[GROUP] {}{}{}",
                    indent,
                    child.label(),
                    description,
                    deleted_suffix(node)
                ));
                render_into(child, reveal, all, depth + 1, lines);
            }
            Node::Entry(entry) => {
                lines.push(format!(
                    "{}{}{}",
                    indent,
                    render_entry(entry, reveal),
                    deleted_suffix(node)
                ));
            }
        }
    }
}

/// Search and render each active match as a label path from the root.
fn render_search(root: &Group, phrase: &str) -> Vec<String> {
    root.search(phrase)
        .into_iter()
        .filter(|lineage| lineage.last().is_some_and(|group| !group.is_deleted()))
        .map(|lineage| {
            let labels: Vec<&str> = lineage.iter().map(|group| group.label()).collect();
            labels.join(" / ")
        })
        .collect()
}

/// Create a new vault.
fn cmd_create(path: &Path, config: VaultConfig) -> Result<()> {
    info!("Creating new vault at: {}", path.display());

    let passphrase = read_new_passphrase()?;
    let vault = create_vault(path, &passphrase, config)?;

    println!("Vault created successfully!");
    println!("  Location: {}", path.display());
    println!("  Root group: {}", vault.root().label());
    println!("  scrypt cost: {}", vault.config().kdf.cost);

    Ok(())
}

/// List a group.
fn cmd_list(path: &Path, config: &VaultConfig, group: &str, reveal: bool, all: bool) -> Result<()> {
    let passphrase = read_passphrase("Enter passphrase: ")?;
    let vault = open_vault(path, &passphrase, config)?;

    let group_path = GroupPath::parse(group).context("Invalid group path")?;
    let group = vault
        .root()
        .find_group(&group_path)
        .context("Failed to find group")?;

    let lines = render_group(group, reveal, all);
    if lines.is_empty() {
        println!("Group {} is empty.", group_path);
    } else {
        println!("Contents of {} ({}):", group_path, group.label());
        for line in lines {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Add a group.
fn cmd_add_group(
    path: &Path,
    config: &VaultConfig,
    parent: &str,
    label: &str,
    description: Option<String>,
) -> Result<()> {
    info!("Adding group {} under {}", label, parent);

    let passphrase = read_passphrase("Enter passphrase: ")?;
    let mut vault = open_vault(path, &passphrase, config)?;
    add_group(&mut vault, parent, label, description)?;
    save_vault(path, &mut vault)?;

    println!("Group added: {}", label);

    Ok(())
}

/// Add an entry.
fn cmd_add_entry(
    path: &Path,
    config: &VaultConfig,
    group: &str,
    label: &str,
    content: Option<String>,
    secret: bool,
) -> Result<()> {
    info!("Adding entry {} under {}", label, group);

    let passphrase = read_passphrase("Enter passphrase: ")?;
    let mut vault = open_vault(path, &passphrase, config)?;
    let content = match content {
        Some(content) => content,
        None => rpassword::prompt_password("Enter content: ").context("Failed to read content")?,
    };
    add_entry(&mut vault, group, label, &content, secret)?;
    save_vault(path, &mut vault)?;

    println!("Entry added: {}", label);

    Ok(())
}

/// Search the vault.
fn cmd_search(path: &Path, config: &VaultConfig, phrase: &str) -> Result<()> {
    let passphrase = read_passphrase("Enter passphrase: ")?;
    let vault = open_vault(path, &passphrase, config)?;

    let matches = render_search(vault.root(), phrase);
    if matches.is_empty() {
        println!("No matches.");
    } else {
        for line in matches {
            println!("  {}", line);
        }
    }

    Ok(())
}

/// Delete or restore a node.
fn cmd_mark(path: &Path, config: &VaultConfig, target: &Target, deleted: bool) -> Result<()> {
    info!(
        "{} {}",
        if deleted { "Deleting" } else { "Restoring" },
        target.describe()
    );

    let passphrase = read_passphrase("Enter passphrase: ")?;
    let mut vault = open_vault(path, &passphrase, config)?;
    mark(&mut vault, target, deleted)?;
    save_vault(path, &mut vault)?;

    if deleted {
        println!("Deleted: {}", target.describe());
    } else {
        println!("Restored: {}", target.describe());
    }

    Ok(())
}

/// Change node fields.
fn cmd_set(path: &Path, config: &VaultConfig, target: &Target, changes: &Changes) -> Result<()> {
    info!("Updating {}", target.describe());

    let passphrase = read_passphrase("Enter passphrase: ")?;
    let mut vault = open_vault(path, &passphrase, config)?;
    apply_changes(&mut vault, target, changes)?;
    save_vault(path, &mut vault)?;

    println!("Updated: {}", target.describe());

    Ok(())
}

/// Change the vault passphrase.
fn cmd_change_passphrase(path: &Path, config: &VaultConfig) -> Result<()> {
    info!("Changing vault passphrase");

    let passphrase = read_passphrase("Enter current passphrase: ")?;
    let mut vault = open_vault(path, &passphrase, config)?;

    let new_passphrase = read_new_passphrase()?;
    if new_passphrase.is_empty() {
        anyhow::bail!("Passphrase cannot be empty");
    }

    vault
        .change_passphrase(&new_passphrase)
        .context("Failed to change passphrase")?;
    save_vault(path, &mut vault)?;

    println!("Passphrase changed successfully!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_crypto::ScryptParams;
    use tempfile::TempDir;

    fn light() -> VaultConfig {
        VaultConfig {
            kdf: ScryptParams::new(1 << 10, 8, 1).unwrap(),
            ..VaultConfig::default()
        }
    }

    fn fixture() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vault.json");
        let mut vault = create_vault(&path, "pw", light()).unwrap();
        add_group(&mut vault, "/", "Work", Some("office".into())).unwrap();
        add_entry(&mut vault, "/Work", "VPN", "token", true).unwrap();
        add_entry(&mut vault, "/", "Note", "hello", false).unwrap();
        save_vault(&path, &mut vault).unwrap();
        (temp, path)
    }

    #[test]
    fn test_create_writes_container() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vault.json");

        create_vault(&path, "pw", light()).unwrap();

        let vault = open_vault(&path, "pw", &light()).unwrap();
        assert_eq!(vault.root().label(), "New");
        assert!(!temp.path().join("vault.json.tmp").exists());
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let (_temp, path) = fixture();
        assert!(create_vault(&path, "pw", light()).is_err());
    }

    #[test]
    fn test_create_refuses_empty_passphrase() {
        let temp = TempDir::new().unwrap();
        assert!(create_vault(&temp.path().join("v.json"), "", light()).is_err());
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let (_temp, path) = fixture();
        assert!(open_vault(&path, "nope", &light()).is_err());
    }

    #[test]
    fn test_list_masks_secrets() {
        let (_temp, path) = fixture();
        let vault = open_vault(&path, "pw", &light()).unwrap();

        let masked = render_group(vault.root(), false, false);
        assert_eq!(
            masked,
            vec![
                "  Note: hello".to_string(),
                "  [GROUP] Work - office".to_string(),
                "    VPN: ********".to_string(),
            ]
        );

        let revealed = render_group(vault.root(), true, false);
        assert_eq!(revealed[2], "    VPN: token");
    }

    #[test]
    fn test_delete_hides_and_restore_shows() {
        let (_temp, path) = fixture();
        let target = Target::parse("/Work", None).unwrap();

        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        mark(&mut vault, &target, true).unwrap();
        save_vault(&path, &mut vault).unwrap();

        let vault = open_vault(&path, "pw", &light()).unwrap();
        assert_eq!(render_group(vault.root(), false, false), vec!["  Note: hello".to_string()]);
        let all = render_group(vault.root(), false, true);
        assert_eq!(all[1], "  [GROUP] Work - office (deleted)");
        assert_eq!(all[2], "    VPN: ******** (deleted)");
        assert!(render_search(vault.root(), "work").is_empty());

        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        mark(&mut vault, &target, false).unwrap();
        assert_eq!(render_search(vault.root(), "work"), vec!["New / Work".to_string()]);
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let (_temp, path) = fixture();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        assert!(mark(&mut vault, &Target::parse("/", None).unwrap(), true).is_err());
    }

    #[test]
    fn test_delete_entry() {
        let (_temp, path) = fixture();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();

        mark(&mut vault, &Target::parse("/Work", Some("VPN".into())).unwrap(), true).unwrap();

        let work = vault.root().child_group("Work").unwrap();
        assert!(!work.is_deleted());
        assert!(work.child_entry("VPN").unwrap().is_deleted());
    }

    #[test]
    fn test_set_entry_fields() {
        let (_temp, path) = fixture();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        let target = Target::parse("/Work", Some("VPN".into())).unwrap();
        let changes = Changes {
            label: Some("Gateway".into()),
            content: Some("rotated".into()),
            secret: Some(false),
            description: None,
        };

        apply_changes(&mut vault, &target, &changes).unwrap();
        save_vault(&path, &mut vault).unwrap();

        let vault = open_vault(&path, "pw", &light()).unwrap();
        let entry = vault
            .root()
            .find_entry(&GroupPath::parse("/Work").unwrap(), "Gateway")
            .unwrap();
        assert_eq!(entry.content(), "rotated");
        assert!(!entry.secret());
    }

    #[test]
    fn test_set_group_description() {
        let (_temp, path) = fixture();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        let target = Target::parse("/Work", None).unwrap();

        let clear = Changes {
            description: Some(String::new()),
            ..Changes::default()
        };
        apply_changes(&mut vault, &target, &clear).unwrap();

        assert_eq!(vault.root().child_group("Work").unwrap().description(), None);
    }

    #[test]
    fn test_set_rejects_mismatched_fields() {
        let (_temp, path) = fixture();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();

        let group = Target::parse("/Work", None).unwrap();
        let content = Changes {
            content: Some("x".into()),
            ..Changes::default()
        };
        assert!(apply_changes(&mut vault, &group, &content).is_err());
        assert!(apply_changes(&mut vault, &group, &Changes::default()).is_err());

        let entry = Target::parse("/Work", Some("VPN".into())).unwrap();
        let description = Changes {
            description: Some("x".into()),
            ..Changes::default()
        };
        assert!(apply_changes(&mut vault, &entry, &description).is_err());
    }

    #[test]
    fn test_missing_group_reported() {
        let (_temp, path) = fixture();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        assert!(add_entry(&mut vault, "/Home", "Wifi", "pw", true).is_err());
    }

    #[test]
    fn test_change_passphrase_persists() {
        let (_temp, path) = fixture();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        vault.change_passphrase("pw2").unwrap();
        save_vault(&path, &mut vault).unwrap();

        assert!(open_vault(&path, "pw", &light()).is_err());
        let vault = open_vault(&path, "pw2", &light()).unwrap();
        assert!(vault.root().child_entry("Note").is_some());
    }

    #[test]
    fn test_config_retention_applies_on_save() {
        let (temp, path) = fixture();
        let note = Target::parse("/", Some("Note".into())).unwrap();
        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        mark(&mut vault, &note, true).unwrap();
        save_vault(&path, &mut vault).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let mut vault = open_vault(&path, "pw", &light()).unwrap();
        add_group(&mut vault, "/", "Home", None).unwrap();
        save_vault(&path, &mut vault).unwrap();
        let vault = open_vault(&path, "pw", &light()).unwrap();
        assert!(vault.root().child_entry("Note").unwrap().is_deleted());

        let config_path = temp.path().join("config.json");
        fs::write(&config_path, r#"{"retention_secs": 0}"#).unwrap();
        let short = load_config(Some(&config_path)).unwrap();
        let mut vault = open_vault(&path, "pw", &short).unwrap();
        add_group(&mut vault, "/", "Garden", None).unwrap();
        save_vault(&path, &mut vault).unwrap();

        let vault = open_vault(&path, "pw", &light()).unwrap();
        assert!(vault.root().child_entry("Note").is_none());
        assert!(vault.root().child_group("Garden").is_some());
    }

    #[test]
    fn test_config_is_a_global_flag() {
        let cli = Cli::try_parse_from([
            "coffer",
            "add-group",
            "--path",
            "vault.json",
            "--label",
            "Home",
            "--config",
            "retention.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("retention.json")));

        let cli = Cli::try_parse_from(["coffer", "--config", "c.json", "create", "--path", "v.json"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Commands::Create { .. }));
    }

    #[test]
    fn test_load_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"retention_secs": 60}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.retention_secs, 60);
        assert_eq!(load_config(None).unwrap(), VaultConfig::default());
    }

    #[test]
    fn test_target_describe() {
        assert_eq!(Target::parse("/", Some("Note".into())).unwrap().describe(), "/Note");
        assert_eq!(Target::parse("/Work", Some("VPN".into())).unwrap().describe(), "/Work/VPN");
        assert_eq!(Target::parse("Work/Mail", None).unwrap().describe(), "/Work/Mail");
    }
}

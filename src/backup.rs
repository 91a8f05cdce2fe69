use crate::db::DB_FILE_NAME;
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Label written into, and required from, every school bundle manifest.
pub const SCHOOL_BUNDLE_FORMAT: &str = "school-workspace-v1";
/// Label reported when a bare school database file is restored.
pub const SCHOOL_DB_FILE_FORMAT: &str = "school-sqlite-file";

const BUNDLE_MANIFEST: &str = "manifest.json";
const BUNDLE_SCHOOL_DB: &str = "db/school.sqlite3";
const BUNDLE_WORKSPACE_META: &str = "meta/workspace.json";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub db_sha256: String,
}

/// What a restore was handed, judged by the file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Bundle,
    SchoolDbFile,
}

impl BackupKind {
    pub fn format(self) -> &'static str {
        match self {
            Self::Bundle => SCHOOL_BUNDLE_FORMAT,
            Self::SchoolDbFile => SCHOOL_DB_FILE_FORMAT,
        }
    }

    fn detect(path: &Path) -> anyhow::Result<Self> {
        let mut head = Vec::with_capacity(SQLITE_MAGIC.len());
        File::open(path)
            .with_context(|| format!("failed to open backup {}", path.display()))?
            .take(SQLITE_MAGIC.len() as u64)
            .read_to_end(&mut head)
            .context("failed to read backup header")?;
        if head.starts_with(ZIP_MAGIC) {
            Ok(Self::Bundle)
        } else if head.starts_with(SQLITE_MAGIC) {
            Ok(Self::SchoolDbFile)
        } else {
            bail!("{} is neither a school bundle nor a SQLite database", path.display())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleManifest {
    format: String,
    db_sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn write_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
) -> anyhow::Result<()> {
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(name, opts)
        .with_context(|| format!("failed to start bundle entry {}", name))?;
    zip.write_all(bytes)
        .with_context(|| format!("failed to write bundle entry {}", name))
}

/// Pack the workspace database, with a checksummed manifest, into `out_path`.
pub fn export_workspace_bundle(workspace_path: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(DB_FILE_NAME);
    if !db_path.is_file() {
        bail!("school database not found in {}", workspace_path.display());
    }
    let db_bytes =
        std::fs::read(&db_path).with_context(|| format!("failed to read {}", db_path.display()))?;
    let db_sha256 = sha256_hex(&db_bytes);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out_file);

    let manifest = json!({
        "format": SCHOOL_BUNDLE_FORMAT,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "dbSha256": db_sha256,
    });
    let meta = json!({ "sourceWorkspace": workspace_path.to_string_lossy() });
    write_entry(&mut zip, BUNDLE_MANIFEST, &serde_json::to_vec_pretty(&manifest)?)?;
    write_entry(&mut zip, BUNDLE_SCHOOL_DB, &db_bytes)?;
    write_entry(&mut zip, BUNDLE_WORKSPACE_META, &serde_json::to_vec_pretty(&meta)?)?;
    zip.finish().context("failed to finalize bundle")?;

    tracing::info!(path = %out_path.display(), sha256 = %db_sha256, "workspace bundle exported");
    Ok(ExportSummary {
        bundle_format: SCHOOL_BUNDLE_FORMAT.to_string(),
        entry_count: 3,
        db_sha256,
    })
}

/// The database bytes of a bundle whose manifest format and checksum agree.
fn read_verified_bundle(path: &Path) -> anyhow::Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("failed to open bundle {}", path.display()))?;
    let mut archive = ZipArchive::new(file).context("invalid zip archive")?;

    let manifest: BundleManifest = serde_json::from_reader(
        archive
            .by_name(BUNDLE_MANIFEST)
            .context("bundle missing manifest.json")?,
    )
    .context("manifest.json is not a school bundle manifest")?;
    if manifest.format != SCHOOL_BUNDLE_FORMAT {
        bail!("unsupported bundle format: {}", manifest.format);
    }

    let mut db_bytes = Vec::new();
    archive
        .by_name(BUNDLE_SCHOOL_DB)
        .with_context(|| format!("bundle missing {}", BUNDLE_SCHOOL_DB))?
        .read_to_end(&mut db_bytes)
        .context("failed to extract school database")?;
    let actual = sha256_hex(&db_bytes);
    if actual != manifest.db_sha256 {
        return Err(anyhow!(
            "database checksum mismatch: manifest {} but bundle contains {}",
            manifest.db_sha256,
            actual
        ));
    }
    Ok(db_bytes)
}

/// Swap `db_bytes` in as the workspace database via a temp file and rename.
fn install_school_db(workspace_path: &Path, db_bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("failed to create workspace {}", workspace_path.display()))?;
    let dst = workspace_path.join(DB_FILE_NAME);
    let staged = workspace_path.join(format!("{}.restoring", DB_FILE_NAME));

    let mut out = File::create(&staged)
        .with_context(|| format!("failed to stage database at {}", staged.display()))?;
    out.write_all(db_bytes).context("failed to write staged database")?;
    out.sync_all().context("failed to flush staged database")?;
    drop(out);

    std::fs::rename(&staged, &dst)
        .with_context(|| format!("failed to move restored database to {}", dst.display()))
}

/// Replace the workspace database from a bundle or a bare database file.
///
/// The caller must have closed its connection to the workspace database.
pub fn restore_workspace(in_path: &Path, workspace_path: &Path) -> anyhow::Result<BackupKind> {
    let kind = BackupKind::detect(in_path)?;
    let db_bytes = match kind {
        BackupKind::Bundle => read_verified_bundle(in_path)?,
        BackupKind::SchoolDbFile => std::fs::read(in_path)
            .with_context(|| format!("failed to read {}", in_path.display()))?,
    };
    install_school_db(workspace_path, &db_bytes)?;
    tracing::info!(path = %in_path.display(), format = kind.format(), "workspace restored");
    Ok(kind)
}

//! 請求書メタデータを JSON マニフェストとして保存する

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ScraperError;
use crate::sfr::Bill;
use crate::traits::{BillSaver, SaveOptions, SaveSummary};

pub const MANIFEST_FILE: &str = "bills.json";
const MANIFEST_TMP_FILE: &str = "bills.json.tmp";

/// 保存先フォルダの `bills.json` に追記する。
///
/// 同じベンダーで日付またはファイル名が一致する請求書は既存とみなしてスキップする。
/// PDF 本体のダウンロードは行わない。
#[derive(Debug, Clone, Default)]
pub struct ManifestSaver;

impl ManifestSaver {
    pub fn new() -> Self {
        Self
    }

    async fn load(path: &Path) -> Result<Vec<Bill>, ScraperError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_duplicate(existing: &[Bill], bill: &Bill, identifiers: &[String]) -> bool {
    existing.iter().any(|saved| {
        let tracked = identifiers.is_empty() || identifiers.contains(&saved.vendor);
        tracked
            && ((saved.date == bill.date && saved.vendor == bill.vendor)
                || saved.file_name == bill.file_name)
    })
}

#[async_trait]
impl BillSaver for ManifestSaver {
    async fn save_bills(
        &self,
        bills: &[Bill],
        folder: &Path,
        options: &SaveOptions,
    ) -> Result<SaveSummary, ScraperError> {
        tokio::fs::create_dir_all(folder).await?;
        let path = folder.join(MANIFEST_FILE);

        let mut manifest = Self::load(&path).await?;
        let mut summary = SaveSummary::default();

        for bill in bills {
            if is_duplicate(&manifest, bill, &options.identifiers) {
                debug!("Bill already saved: {}", bill.file_name);
                summary.skipped += 1;
                continue;
            }
            manifest.push(bill.clone());
            summary.saved += 1;
        }

        // 一時ファイルに書いてから置き換える
        let json = serde_json::to_string_pretty(&manifest)?;
        let tmp_path = folder.join(MANIFEST_TMP_FILE);
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        info!(
            "Updated {:?}: {} saved, {} skipped",
            path, summary.saved, summary.skipped
        );

        Ok(summary)
    }
}

use anyhow::Result;
use e8wrangler::{
    catalog::{parse_workbook_name, Catalog},
    export,
    fetch,
    history::{History, Stage},
};
use reqwest::Client;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    sync::{mpsc, Semaphore},
    time::Instant,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,e8wrangler=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure dirs ───────────────────────────────────────────
    let catalog_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "catalog.yaml".to_string());
    let client = Client::new();
    let workbooks_dir = PathBuf::from("workbooks");
    let out_parquet_dir = PathBuf::from("parquet");
    let history_dir = PathBuf::from("history");

    for d in &[&workbooks_dir, &out_parquet_dir, &history_dir] {
        fs::create_dir_all(d)?;
    }

    // ─── 3) load catalog + history ───────────────────────────────────
    let catalog = Catalog::load(&catalog_path)?;
    let history = History::new(&history_dir)?;
    let downloaded = history.load_stage_names(Stage::Downloaded)?;
    info!("{} workbooks already downloaded", downloaded.len());

    // ─── 4) discover new workbook URLs ───────────────────────────────
    let mut to_download = Vec::new();
    if !catalog.download_pages.is_empty() {
        let pages = fetch::urls::fetch_workbook_urls(&client, &catalog.download_pages).await?;
        to_download = pages
            .values()
            .flatten()
            .filter(|u| {
                let name = Path::new(u)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                !name.is_empty() && !downloaded.contains(&name)
            })
            .cloned()
            .collect();
    }
    info!("{} workbooks to download", to_download.len());

    // ─── 5) spawn downloader tasks ──────────────────────────────────
    let (tx, mut rx) = mpsc::channel::<Result<PathBuf, (String, String)>>(100);
    let dl_sem = Arc::new(Semaphore::new(3));
    let mut dl_handles = Vec::with_capacity(to_download.len());

    for url in to_download {
        let client = client.clone();
        let workbooks_dir = workbooks_dir.clone();
        let tx = tx.clone();
        let sem = dl_sem.clone();

        dl_handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            info!(url = %url, "downloading");
            let start = Instant::now();
            match fetch::workbooks::download_workbook(&client, &url, &workbooks_dir).await {
                Ok(path) => {
                    info!(path = %path.display(), elapsed = ?start.elapsed(), "downloaded");
                    let _ = tx.send(Ok(path)).await;
                }
                Err(err) => {
                    error!("{} failed: {}", url, err);
                    let _ = tx.send(Err((url.clone(), err.to_string()))).await;
                }
            }
        }));
    }
    // drop the original sender so `rx.recv()` ends once all downloads complete
    drop(tx);

    while let Some(msg) = rx.recv().await {
        match msg {
            Ok(path) => {
                let name = path.file_name().unwrap().to_string_lossy().to_string();
                if let Some(meta) = parse_workbook_name(&name) {
                    info!(
                        measure = %meta.measure,
                        breakdown = %meta.breakdown,
                        scope = %meta.scope,
                        "recognized export"
                    );
                }
                history.record_event(&name, Stage::Downloaded, 0)?;
            }
            Err((url, err)) => {
                error!("download error {}: {}", url, err);
            }
        }
    }
    for h in dl_handles {
        let _ = h.await;
    }

    // ─── 6) normalize + export each pending dataset ──────────────────
    let normalized = history.load_stage_names(Stage::Normalized)?;
    info!("{} datasets already normalized", normalized.len());

    for spec in &catalog.datasets {
        if normalized.contains(&spec.name) {
            continue;
        }
        if !workbooks_dir.join(&spec.workbook).is_file() {
            error!(
                "dataset {} skipped: workbook {} not present",
                spec.name,
                spec.workbook.display()
            );
            continue;
        }

        info!("normalizing {}", spec.name);
        let result = tokio::task::spawn_blocking({
            let spec = spec.clone();
            let workbooks_dir = workbooks_dir.clone();
            let out_parquet_dir = out_parquet_dir.clone();
            move || export::export_dataset(&spec, &workbooks_dir, &out_parquet_dir)
        })
        .await?;

        match result {
            Ok(rows) => {
                history.record_event(&spec.name, Stage::Normalized, rows)?;
                info!("wrote history for {}", spec.name);
            }
            Err(e) => {
                // a structurally broken sheet fails this dataset only
                error!("normalize {} failed: {:#}", spec.name, e);
            }
        }
    }

    info!("all done");
    Ok(())
}

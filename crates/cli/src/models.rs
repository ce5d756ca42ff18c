use anyhow::{Context as AnyhowContext, Result};
use docchat_vector_store::ModelSpec;
use reqwest::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const HF_BASE_URL: &str = "https://huggingface.co";
const HF_REVISION: &str = "main";

#[derive(Debug, Serialize)]
pub struct InstalledFile {
    pub path: String,
    pub sha256: String,
    pub downloaded: bool,
}

#[derive(Debug, Serialize)]
pub struct InstallModelReport {
    pub model: String,
    pub model_dir: String,
    pub files: Vec<InstalledFile>,
}

/// Remote file name and local destination for every asset of `spec`.
fn assets(spec: &ModelSpec, model_dir: &Path) -> Vec<(String, PathBuf)> {
    vec![
        (spec.onnx_file.to_string(), spec.model_path(model_dir)),
        ("tokenizer.json".to_string(), spec.tokenizer_path(model_dir)),
    ]
}

fn asset_url(spec: &ModelSpec, filename: &str) -> String {
    format!("{HF_BASE_URL}/{}/resolve/{HF_REVISION}/{filename}", spec.repo)
}

/// Download the ONNX export and tokenizer of `model_id` into `model_dir`.
///
/// Files already present are kept unless `force` is set.
pub async fn install_model(model_id: &str, model_dir: &Path, force: bool) -> Result<InstallModelReport> {
    let spec = ModelSpec::find(model_id)?;
    let client = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let mut files = Vec::new();
    for (filename, local_path) in assets(spec, model_dir) {
        if local_path.exists() && !force {
            let sha256 = sha256_file(&local_path)
                .with_context(|| format!("Failed to hash {}", local_path.display()))?;
            log::info!("Keeping existing {}", local_path.display());
            files.push(InstalledFile {
                path: local_path.display().to_string(),
                sha256,
                downloaded: false,
            });
            continue;
        }

        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let url = asset_url(spec, &filename);
        let tmp_path = temp_path_for(&local_path);
        log::info!("Downloading {url}");
        let sha256 = download_with_sha256(&client, &url, &tmp_path).await?;
        std::fs::rename(&tmp_path, &local_path).inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp_path);
        }).with_context(|| {
            format!(
                "Failed to move {} to {}",
                tmp_path.display(),
                local_path.display()
            )
        })?;

        files.push(InstalledFile {
            path: local_path.display().to_string(),
            sha256,
            downloaded: true,
        });
    }

    Ok(InstallModelReport {
        model: spec.id.to_string(),
        model_dir: model_dir.display().to_string(),
        files,
    })
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_lower_hex(&hasher.finalize()))
}

/// Stream `url` into `dest`, hashing as it goes. A failed download removes
/// the partial file.
async fn download_with_sha256(client: &Client, url: &str, dest: &Path) -> Result<String> {
    let result = stream_to_file(client, url, dest).await;
    if result.is_err() && dest.exists() {
        if let Err(err) = std::fs::remove_file(dest) {
            log::warn!("Failed to remove partial download {}: {err}", dest.display());
        }
    }
    result
}

async fn stream_to_file(client: &Client, url: &str, dest: &Path) -> Result<String> {
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Download failed: GET {url}"))?
        .error_for_status()
        .with_context(|| format!("Download failed: GET {url}"))?;

    let mut file =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut hasher = Sha256::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("Failed while reading HTTP body from {url}"))?
    {
        file.write_all(&chunk)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        hasher.update(&chunk);
    }
    file.flush()
        .with_context(|| format!("Failed to flush {}", dest.display()))?;

    Ok(to_lower_hex(&hasher.finalize()))
}

fn to_lower_hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(LUT[(byte >> 4) as usize] as char);
        out.push(LUT[(byte & 0x0f) as usize] as char);
    }
    out
}

fn temp_path_for(path: &Path) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    PathBuf::from(format!("{}.{}.download", path.display(), ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_asset_layout() {
        let spec = ModelSpec::find("bge-small-en-v1.5").unwrap();
        let dir = Path::new("models");
        let assets = assets(spec, dir);
        assert_eq!(assets[0].1, dir.join("bge-small-en-v1.5").join("model.onnx"));
        assert_eq!(assets[1].1, dir.join("bge-small-en-v1.5").join("tokenizer.json"));
        assert_eq!(
            asset_url(spec, &assets[0].0),
            "https://huggingface.co/BAAI/bge-small-en-v1.5/resolve/main/onnx/model.onnx"
        );
    }

    #[test]
    fn test_sha256_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_existing_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ModelSpec::find("bge-small-en-v1.5").unwrap();
        for (_, path) in assets(spec, dir.path()) {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"abc").unwrap();
        }

        let report = install_model("bge-small-en-v1.5", dir.path(), false)
            .await
            .unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(report.files.iter().all(|f| !f.downloaded));
    }

    #[tokio::test]
    async fn test_truncated_download_leaves_no_partial_file() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000\r\n\r\npartial body")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = temp_path_for(&dir.path().join("model.onnx"));
        let result =
            download_with_sha256(&Client::new(), &format!("http://{addr}/model.onnx"), &dest).await;
        server.await.unwrap();

        assert!(result.is_err());
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(install_model("gpt-9", dir.path(), false).await.is_err());
    }
}

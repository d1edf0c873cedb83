use crate::error::{PdfIndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// フォントパスを上書きする環境変数
pub const FONT_ENV_VAR: &str = "PDF_INDEX_FONT";
/// 既定のフォントファイル名
pub const DEFAULT_FONT_FILE: &str = "simsun.ttc";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub font_path: Option<PathBuf>,
    /// イベントキューのポーリング間隔
    pub poll_interval_ms: u64,
    pub compress_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font_path: None,
            poll_interval_ms: 100,
            compress_output: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PdfIndexError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("pdf-index").join("config.json"))
    }

    /// 使用するフォントファイルを決定
    ///
    /// 優先順位: 引数 > 環境変数 > 設定ファイル > カレント > 実行ファイルの隣。
    /// どれも存在しない場合はカレントの既定ファイル名を返す（読み込み時にエラーになる）。
    pub fn resolve_font_path(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }

        // 環境変数を優先
        if let Ok(path) = std::env::var(FONT_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.font_path {
            return path.clone();
        }

        let cwd_candidate = PathBuf::from(DEFAULT_FONT_FILE);
        if cwd_candidate.is_file() {
            return cwd_candidate;
        }

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            let exe_candidate = exe_dir.join(DEFAULT_FONT_FILE);
            if exe_candidate.is_file() {
                return exe_candidate;
            }
        }

        cwd_candidate
    }

    /// フォントパスを保存（存在しないファイルは拒否）
    pub fn set_font_path(&mut self, path: PathBuf) -> Result<()> {
        if !path.is_file() {
            return Err(PdfIndexError::FileNotFound(path.display().to_string()));
        }
        self.font_path = Some(path);
        self.save()
    }
}

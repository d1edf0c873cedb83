use super::{BatchRunner, CancelToken};
use crate::error::{PdfIndexError, Result};
use crate::stamper::Stamp;
use pdf_index_common::RunEvent;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

/// ワーカースレッドで動くバッチ処理と、その操作口
///
/// 呼び出し側は `try_next_event` を一定間隔でポーリングし、ブロックしない。
pub struct BatchSession {
    events: Receiver<RunEvent>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl BatchSession {
    /// 出力ディレクトリを用意してワーカーを起動
    ///
    /// 出力ディレクトリを作れない場合は起動前にエラーを返す。
    pub fn start<S>(table_path: PathBuf, output_dir: PathBuf, stamper: S) -> Result<Self>
    where
        S: Stamp + Send + 'static,
    {
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(PdfIndexError::OutputDir(format!(
                "{}: ディレクトリではありません",
                output_dir.display()
            )));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| PdfIndexError::OutputDir(format!("{}: {}", output_dir.display(), e)))?;

        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let runner = BatchRunner::new(stamper, cancel.clone());

        let worker = std::thread::Builder::new()
            .name("pdf-index-worker".into())
            .spawn(move || {
                let mut terminal_sent = false;
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    runner.run(&table_path, &output_dir, |event| {
                        terminal_sent |= event.is_terminal();
                        // 受信側が先に破棄されても処理は続ける
                        let _ = tx.send(event);
                    });
                }));

                // パニックしても終端イベントはちょうど1つ送る
                if let Err(payload) = result {
                    let detail = panic_message(payload.as_ref());
                    log::error!("ワーカースレッドがパニックしました: {}", detail);
                    if !terminal_sent {
                        let _ = tx.send(RunEvent::FatalError(format!(
                            "fatal error: worker panicked: {}",
                            detail
                        )));
                    }
                }
            })?;

        Ok(Self {
            events: rx,
            cancel,
            worker: Some(worker),
        })
    }

    /// 中断を要求（処理中の行は最後まで実行される）
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 別スレッド（シグナルハンドラ等）から中断するためのトークン
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 次のイベントを取り出す（なければ None）
    pub fn try_next_event(&self) -> Option<RunEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// ワーカーが終了したか
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// ワーカーの終了を待ち、未取得のイベントをすべて返す
    pub fn join(mut self) -> Vec<RunEvent> {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("ワーカースレッドが異常終了しました");
            }
        }
        self.events.try_iter().collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

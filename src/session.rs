//! Serialized frame delivery for capture callbacks running on other threads.
//!
//! Frames and resets share one bounded queue drained by a single worker
//! thread, so a reset never lands in the middle of a frame.

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::counter::{FrameResult, RepCounter, RepCounterState};
use crate::detection::Detection;
use crate::pose::Pose;

/// コマンド・結果キューのデフォルト容量（約1秒分 @30fps）
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

enum Command {
    Frame { pose: Pose, detections: Vec<Detection> },
    Reset,
}

/// 別スレッドからフレームを投入するためのハンドル
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::SyncSender<Command>,
}

impl FrameSender {
    /// フレームを投入。キューが満杯なら空くまで待つ
    pub fn submit(&self, pose: Pose, detections: Vec<Detection>) -> Result<()> {
        self.send(Command::Frame { pose, detections })
    }

    /// フレームを投入。キューが満杯ならフレームを捨ててfalse
    pub fn try_submit(&self, pose: Pose, detections: Vec<Detection>) -> Result<bool> {
        match self.tx.try_send(Command::Frame { pose, detections }) {
            Ok(()) => Ok(true),
            Err(mpsc::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::TrySendError::Disconnected(_)) => {
                Err(anyhow!("counter session has stopped"))
            }
        }
    }

    /// リセットは捨てずに必ずキューに入れる
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("counter session has stopped"))
    }
}

/// ワーカースレッドが `RepCounter` を専有するカウントセッション
///
/// 結果キューも有界で、読まれずに満杯になった結果は捨てて件数だけ数える。
pub struct CounterSession {
    sender: FrameSender,
    results: mpsc::Receiver<FrameResult>,
    dropped_results: Arc<AtomicU64>,
    handle: thread::JoinHandle<RepCounterState>,
}

impl CounterSession {
    pub fn start(counter: RepCounter) -> Result<Self> {
        Self::with_capacity(counter, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(mut counter: RepCounter, capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::sync_channel::<Command>(capacity);
        let (result_tx, results) = mpsc::sync_channel::<FrameResult>(capacity);
        let dropped_results = Arc::new(AtomicU64::new(0));
        let dropped_ref = dropped_results.clone();

        let handle = thread::Builder::new()
            .name("rep-counter".to_string())
            .spawn(move || {
                for command in rx {
                    match command {
                        Command::Frame { pose, detections } => {
                            let result = counter.process_frame(&pose, &detections);
                            match result_tx.try_send(result) {
                                Ok(()) => {}
                                Err(mpsc::TrySendError::Full(_)) => {
                                    dropped_ref.fetch_add(1, Ordering::Release);
                                }
                                // 受信側が破棄されていても処理は続ける
                                Err(mpsc::TrySendError::Disconnected(_)) => {}
                            }
                        }
                        Command::Reset => counter.reset_session(),
                    }
                }
                counter.into_state()
            })
            .context("Failed to spawn counter thread")?;

        Ok(Self {
            sender: FrameSender { tx },
            results,
            dropped_results,
            handle,
        })
    }

    pub fn sender(&self) -> FrameSender {
        self.sender.clone()
    }

    pub fn submit(&self, pose: Pose, detections: Vec<Detection>) -> Result<()> {
        self.sender.submit(pose, detections)
    }

    pub fn try_submit(&self, pose: Pose, detections: Vec<Detection>) -> Result<bool> {
        self.sender.try_submit(pose, detections)
    }

    pub fn reset(&self) -> Result<()> {
        self.sender.reset()
    }

    /// 届いている結果を投入順に返す（待たない）
    pub fn results(&self) -> mpsc::TryIter<'_, FrameResult> {
        self.results.try_iter()
    }

    /// 次の結果を待つ。ワーカーが停止していればNone
    pub fn recv(&self) -> Option<FrameResult> {
        self.results.recv().ok()
    }

    /// 結果キューが満杯で捨てた結果の数
    pub fn dropped_results(&self) -> u64 {
        self.dropped_results.load(Ordering::Acquire)
    }

    /// キューを閉じ、残りのフレームを処理し終えた最終状態を返す
    ///
    /// `sender()` で配ったハンドルがすべて破棄されるまで戻らない。
    pub fn finish(self) -> Result<RepCounterState> {
        let Self { sender, handle, .. } = self;
        drop(sender);
        handle
            .join()
            .map_err(|_| anyhow!("counter thread panicked"))
    }
}

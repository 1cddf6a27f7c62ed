use crossbeam_channel::{Receiver, Sender};
use futures_util::future::{AbortHandle, AbortRegistration, Abortable};
use log::{error, info};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;

use crate::classify::TextKind;
use crate::client::Translator;
use crate::config::{Settings, SettingsStore};
use crate::error::{Result, TranslateError};
use crate::protocol::{BackgroundRequest, TranslateReply};

/// A single-shot reply to one request.
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
    abort: AbortHandle,
}

impl<T> Pending<T> {
    /// Non-blocking poll for the UI thread. `None` while the request is still running.
    pub fn try_take(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(res) => Some(res),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(worker_gone())),
        }
    }

    pub async fn wait(self) -> Result<T> {
        self.rx.await.unwrap_or_else(|_| Err(worker_gone()))
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }
}

fn worker_gone() -> TranslateError {
    TranslateError::Api {
        message: "Background worker stopped".into(),
        status: None,
    }
}

enum Reply {
    Translate(oneshot::Sender<Result<TranslateReply>>),
    TestConnection(oneshot::Sender<Result<String>>),
}

enum WorkItem {
    Request {
        request: BackgroundRequest,
        abort: AbortRegistration,
        reply: Reply,
    },
    Shutdown,
}

/// Owns the network worker thread. Requests go in over a channel; each one
/// gets exactly one reply, or a cancellation if it was aborted first.
pub struct Background {
    work_tx: Sender<WorkItem>,
    current: Mutex<Option<AbortHandle>>,
    _handle: thread::JoinHandle<()>,
}

impl Background {
    pub fn start(store: Arc<SettingsStore>) -> Self {
        let (work_tx, work_rx) = crossbeam_channel::unbounded::<WorkItem>();
        let translator = Translator::new(store);
        let handle = thread::spawn(move || run_worker(translator, work_rx));
        Self {
            work_tx,
            current: Mutex::new(None),
            _handle: handle,
        }
    }

    /// Starts a translation, aborting whichever translation was issued before it.
    pub fn translate(&self, text: String, kind: TextKind) -> Pending<TranslateReply> {
        let (tx, rx) = oneshot::channel();
        let (abort, reg) = AbortHandle::new_pair();
        {
            let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(prev) = current.replace(abort.clone()) {
                prev.abort();
            }
        }
        let request = BackgroundRequest::Translate {
            text,
            is_word_mode: kind.is_word(),
        };
        self.submit(request, reg, Reply::Translate(tx));
        Pending { rx, abort }
    }

    pub fn test_connection(&self, settings: Settings) -> Pending<String> {
        let (tx, rx) = oneshot::channel();
        let (abort, reg) = AbortHandle::new_pair();
        self.submit(
            BackgroundRequest::TestConnection { settings },
            reg,
            Reply::TestConnection(tx),
        );
        Pending { rx, abort }
    }

    fn submit(&self, request: BackgroundRequest, abort: AbortRegistration, reply: Reply) {
        // If the worker is gone the reply sender is dropped and the Pending reports it.
        let _ = self.work_tx.send(WorkItem::Request {
            request,
            abort,
            reply,
        });
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        let _ = self.work_tx.send(WorkItem::Shutdown);
    }
}

async fn abortable<T>(reg: AbortRegistration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    Abortable::new(fut, reg)
        .await
        .unwrap_or(Err(TranslateError::Cancelled))
}

fn run_worker(translator: Translator, work_rx: Receiver<WorkItem>) {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return;
        }
    };
    info!("Background worker started");

    while let Ok(item) = work_rx.recv() {
        let (request, reg, reply) = match item {
            WorkItem::Shutdown => break,
            WorkItem::Request {
                request,
                abort,
                reply,
            } => (request, abort, reply),
        };
        let translator = translator.clone();
        rt.spawn(async move {
            match (request, reply) {
                (BackgroundRequest::Translate { text, is_word_mode }, Reply::Translate(tx)) => {
                    let kind = if is_word_mode {
                        TextKind::Word
                    } else {
                        TextKind::Paragraph
                    };
                    let res = abortable(reg, translator.translate(&text, kind)).await;
                    match &res {
                        Ok(_) => info!("Translation finished"),
                        Err(TranslateError::Cancelled) => info!("Translation cancelled"),
                        Err(e) => error!("Translation failed: {}", e),
                    }
                    let _ = tx.send(res);
                }
                (BackgroundRequest::TestConnection { settings }, Reply::TestConnection(tx)) => {
                    let res = abortable(reg, translator.test_connection(&settings)).await;
                    let _ = tx.send(res);
                }
                _ => error!("Mismatched background request and reply kind"),
            }
        });
    }

    rt.shutdown_background();
    info!("Background worker stopped");
}

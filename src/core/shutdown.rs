use tokio::{
    select,
    signal::ctrl_c,
    sync::{broadcast, mpsc},
};

/// Held by every task that must be told to stop. The owning [`Shutdown`] waits for all
/// handles to be dropped before reporting completion.
#[derive(Debug)]
pub struct ShutdownHandle {
    #[allow(unused)]
    inner: mpsc::Sender<()>,
    listener: broadcast::Receiver<()>,
    trigger: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub async fn wait_for_shutdown(&mut self) {
        let _ = self.listener.recv().await;
    }

    pub fn trigger_shutdown(&mut self) {
        let _ = self.trigger.send(());
    }
}

pub struct Shutdown {
    tx: Option<mpsc::Sender<()>>,
    rx: mpsc::Receiver<()>,
    trigger: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        let (trigger, _) = broadcast::channel(1);
        Self {
            tx: Some(tx),
            rx,
            trigger,
        }
    }

    /// # Panics
    /// if called after [`Shutdown::wait_for_completion`]
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            inner: self
                .tx
                .clone()
                .expect("shutdown handle requested after completion"),
            listener: self.trigger.subscribe(),
            trigger: self.trigger.clone(),
        }
    }

    pub async fn wait_for_completion(&mut self) {
        drop(self.tx.take());
        self.rx.recv().await;
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.trigger.send(());
    }
}

/// turns the first ctrl+c into a shutdown trigger
pub fn trap_ctrl_c(mut handle: ShutdownHandle) {
    tokio::spawn(async move {
        select! {
            res = ctrl_c() => {
                if res.is_err() {
                    error!("Failed to listen for ctrl_c signal - triggering shutdown");
                }
                info!("shutdown triggered");
                handle.trigger_shutdown();
            }
            _ = handle.wait_for_shutdown() => {}
        }
    });
}

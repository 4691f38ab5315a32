use kiosk_slideshow::events::ControlCommand;
use kiosk_slideshow::tasks::files;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_image_requests_one_reload() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().to_path_buf();

    let (control_tx, mut control_rx) = mpsc::channel::<ControlCommand>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(files::run(
        lib.clone(),
        "jpg".into(),
        control_tx,
        cancel.clone(),
    ));

    // Give the watcher time to register
    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(lib.join("a.jpg"), b"x").unwrap();
    fs::write(lib.join("b.JPG"), b"x").unwrap();

    let cmd = tokio::time::timeout(Duration::from_secs(5), control_rx.recv())
        .await
        .expect("timeout waiting for reload")
        .expect("control channel closed");
    assert_eq!(cmd, ControlCommand::Reload);

    // Both writes landed inside one settle window.
    let extra = tokio::time::timeout(Duration::from_millis(1500), control_rx.recv()).await;
    assert!(extra.is_err(), "unexpected extra command: {extra:?}");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn other_extensions_are_ignored() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().to_path_buf();

    let (control_tx, mut control_rx) = mpsc::channel::<ControlCommand>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(files::run(
        lib.clone(),
        "jpg".into(),
        control_tx,
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(lib.join("notes.txt"), b"x").unwrap();
    fs::write(lib.join("c.png"), b"x").unwrap();

    let res = tokio::time::timeout(Duration::from_millis(1500), control_rx.recv()).await;
    assert!(res.is_err(), "unexpected command: {res:?}");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_library_fails_to_watch() {
    let tmp = tempdir().unwrap();
    let (control_tx, _control_rx) = mpsc::channel::<ControlCommand>(1);
    let res = files::run(
        tmp.path().join("gone"),
        "jpg".into(),
        control_tx,
        CancellationToken::new(),
    )
    .await;
    assert!(res.is_err());
}

use std::path::Path;

use image::{Rgb, RgbImage};
use kiosk_slideshow::config::TransitionOptions;
use kiosk_slideshow::image_set::ImageSet;
use kiosk_slideshow::render::{SharedRenderer, SoftwareRenderer};
use kiosk_slideshow::transition::cross_fade;
use tokio_util::sync::CancellationToken;

fn solid_jpeg(path: &Path, w: u32, h: u32, rgb: [u8; 3]) {
    RgbImage::from_pixel(w, h, Rgb(rgb)).save(path).unwrap();
}

fn close_to(px: [u8; 4], rgb: [u8; 3]) -> bool {
    px[..3]
        .iter()
        .zip(rgb.iter())
        .all(|(a, b)| a.abs_diff(*b) <= 8)
}

#[tokio::test(start_paused = true)]
async fn fade_ends_on_destination_image() {
    let dir = tempfile::tempdir().unwrap();
    solid_jpeg(&dir.path().join("a.jpg"), 16, 16, [220, 20, 20]);
    solid_jpeg(&dir.path().join("b.jpg"), 16, 16, [20, 20, 220]);
    std::fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

    let renderer = SharedRenderer::new(SoftwareRenderer::new(32, 32));
    let set = ImageSet::load(&mut *renderer.lock(), dir.path(), "jpg", 16).unwrap();
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["a.jpg", "b.jpg"]);

    let outcome = cross_fade(
        &renderer,
        set.at(0).unwrap(),
        set.at(1).unwrap(),
        &TransitionOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(!outcome.cut_short);
    let renderer = renderer.lock();
    assert!(renderer.frames_presented() > 0);

    let front = renderer.front();
    assert!(close_to(front.get_pixel(16, 16).0, [20, 20, 220]));
    assert_eq!(front.get_pixel(0, 0).0, [0, 0, 0, 255]);
    assert_eq!(front.get_pixel(31, 31).0, [0, 0, 0, 255]);
}

#[tokio::test]
async fn large_images_are_scaled_to_fit() {
    let dir = tempfile::tempdir().unwrap();
    solid_jpeg(&dir.path().join("wide.jpg"), 64, 32, [200, 200, 200]);

    let mut renderer = SoftwareRenderer::new(32, 32);
    let set = ImageSet::load(&mut renderer, dir.path(), "jpg", 32).unwrap();
    let entry = set.at(0).unwrap();
    assert_eq!(entry.surface.dimensions(), (32, 16));
    assert_eq!(entry.placement.x, 0);
    assert_eq!(entry.placement.y, 8);
}

#[tokio::test]
async fn snapshot_is_written_on_present() {
    use kiosk_slideshow::render::Renderer;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("frame.png");
    let mut renderer = SoftwareRenderer::new(8, 4).with_snapshot_path(&snapshot);
    renderer.clear([10, 200, 30]);
    renderer.present().unwrap();

    let saved = image::open(&snapshot).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (8, 4));
    assert_eq!(saved.get_pixel(3, 2).0, [10, 200, 30, 255]);
}

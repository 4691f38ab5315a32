//! Timed cross-fade between two images.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::TransitionOptions;
use crate::image_set::ImageEntry;
use crate::render::{RenderError, Renderer, SharedRenderer};

/// What happened during one [`cross_fade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeOutcome {
    /// Frames presented, including the final opaque one.
    pub frames: u32,
    /// Intermediate frames dropped because the renderer failed.
    pub dropped: u32,
    /// The fade stopped early because it ran out of time or was cancelled.
    pub cut_short: bool,
}

/// Time between frames at the given cap.
pub fn frame_period(frame_rate_cap: u32) -> Duration {
    Duration::from_secs(1) / frame_rate_cap.max(1)
}

/// Alpha increment per frame so a fade covers 0..=255 in about `duration`.
pub fn alpha_step(duration: Duration, frame_rate_cap: u32) -> u32 {
    let frames = (duration.as_secs_f64() * f64::from(frame_rate_cap.max(1))).ceil() as u32;
    255u32.div_ceil(frames.max(1)).max(1)
}

/// Fade from `from` to `to`: each frame paints the outgoing image opaque and
/// the incoming one on top with rising opacity.
///
/// The loop is bounded both by alpha reaching 255 and by `opts.duration`
/// elapsing; cancellation also ends it. However it ends, the last frame
/// presented is `to` at full opacity on a cleared canvas.
///
/// # Errors
/// Only a failure to present that final frame is returned; intermediate
/// frame failures are logged and dropped.
pub async fn cross_fade<R: Renderer>(
    renderer: &SharedRenderer<R>,
    from: &ImageEntry<R::Surface>,
    to: &ImageEntry<R::Surface>,
    opts: &TransitionOptions,
    cancel: &CancellationToken,
) -> Result<FadeOutcome, RenderError> {
    let step = alpha_step(opts.duration, opts.frame_rate_cap);
    let mut ticker = interval(frame_period(opts.frame_rate_cap));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let started = Instant::now();
    let mut outcome = FadeOutcome {
        frames: 0,
        dropped: 0,
        cut_short: false,
    };
    let mut alpha = 0u32;
    while alpha < 255 {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.cut_short = true;
                break;
            }
            _ = ticker.tick() => {}
        }
        if started.elapsed() >= opts.duration {
            outcome.cut_short = true;
            break;
        }
        let frame = {
            let (from, to) = (from.clone(), to.clone());
            let (alpha, background) = (alpha as u8, opts.background);
            renderer
                .run(move |r| blend_frame(r, &from, &to, alpha, background))
                .await
        };
        match frame {
            Ok(()) => outcome.frames += 1,
            Err(err) => {
                warn!(alpha, error = %err, "dropping transition frame");
                outcome.dropped += 1;
            }
        }
        alpha += step;
    }

    let (last, background) = (to.clone(), opts.background);
    renderer
        .run(move |r| {
            r.clear(background);
            r.draw(&last.surface, last.placement, 255)?;
            r.present()
        })
        .await?;
    outcome.frames += 1;
    debug!(from = %from.name, to = %to.name, ?outcome, elapsed = ?started.elapsed(), "cross-fade done");
    Ok(outcome)
}

fn blend_frame<R: Renderer>(
    renderer: &mut R,
    from: &ImageEntry<R::Surface>,
    to: &ImageEntry<R::Surface>,
    alpha: u8,
    background: [u8; 3],
) -> Result<(), RenderError> {
    renderer.clear(background);
    renderer.draw(&from.surface, from.placement, 255)?;
    renderer.draw(&to.surface, to.placement, alpha)?;
    renderer.present()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Placement;
    use crate::testkit::{FakeSurface, RecordingRenderer, RenderOp};
    use std::sync::Arc;

    fn entry(name: &str) -> ImageEntry<FakeSurface> {
        ImageEntry {
            surface: Arc::new(FakeSurface {
                name: name.to_string(),
                size: (10, 10),
            }),
            placement: Placement::centered((10, 10), (10, 10)),
            name: name.to_string(),
        }
    }

    fn opts(duration_ms: u64, fps: u32) -> TransitionOptions {
        TransitionOptions {
            duration: Duration::from_millis(duration_ms),
            frame_rate_cap: fps,
            background: [0, 0, 0],
        }
    }

    #[test]
    fn step_covers_full_range_in_budgeted_frames() {
        assert_eq!(alpha_step(Duration::from_millis(1000), 60), 5);
        assert_eq!(alpha_step(Duration::from_millis(100), 10), 255);
        assert_eq!(alpha_step(Duration::from_secs(10), 60), 1);
        assert_eq!(frame_period(50), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn fade_ramps_alpha_and_ends_opaque() {
        let r = RecordingRenderer::new(10, 10);
        let cancel = CancellationToken::new();
        let shared = SharedRenderer::new(r.clone());
        let out = cross_fade(&shared, &entry("a"), &entry("b"), &opts(1000, 60), &cancel)
            .await
            .unwrap();

        let alphas: Vec<u8> = r
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                RenderOp::Draw { name, opacity } if name == "b" => Some(opacity),
                _ => None,
            })
            .collect();
        assert_eq!(alphas.first(), Some(&0));
        assert!(alphas.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(alphas.last(), Some(&255));
        assert_eq!(r.last_frame().unwrap(), vec![("b".to_string(), 255)]);
        assert_eq!(out.frames as usize, r.present_count());
        assert_eq!(out.dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_frames_hit_the_deadline_and_still_end_opaque() {
        // 1 fps cap, 2.5s duration: only three of 255 alpha levels fit.
        let r = RecordingRenderer::new(10, 10);
        let cancel = CancellationToken::new();
        let shared = SharedRenderer::new(r.clone());
        let out = cross_fade(&shared, &entry("a"), &entry("b"), &opts(2500, 1), &cancel)
            .await
            .unwrap();
        assert!(out.frames <= 4);
        assert_eq!(r.visible_image().as_deref(), Some("b"));
        assert_eq!(r.last_frame().unwrap(), vec![("b".to_string(), 255)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_fade_jumps_to_destination() {
        let r = RecordingRenderer::new(10, 10);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let shared = SharedRenderer::new(r.clone());
        let out = cross_fade(&shared, &entry("a"), &entry("b"), &opts(1000, 60), &cancel)
            .await
            .unwrap();
        assert!(out.cut_short);
        assert_eq!(out.frames, 1);
        assert_eq!(r.last_frame().unwrap(), vec![("b".to_string(), 255)]);
    }

    #[tokio::test(start_paused = true)]
    async fn renderer_failures_drop_frames_only() {
        let r = RecordingRenderer::new(10, 10);
        r.fail_next_draws(3);
        let cancel = CancellationToken::new();
        let shared = SharedRenderer::new(r.clone());
        let out = cross_fade(&shared, &entry("a"), &entry("b"), &opts(1000, 60), &cancel)
            .await
            .unwrap();
        assert!(out.dropped >= 2);
        assert_eq!(r.visible_image().as_deref(), Some("b"));
    }
}

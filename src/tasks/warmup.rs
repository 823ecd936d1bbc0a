use core::sync::atomic::{AtomicBool, Ordering};
use defmt::{error, info, warn};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};

use crate::config::AppConfig;
use crate::hal::{BoardSensor, EmbassyYield};
use crate::led::LedCommand;

/// Set once the sensor is preheated and RZero has been calibrated
pub static WARMUP_DONE: AtomicBool = AtomicBool::new(false);

#[embassy_executor::task]
pub async fn mq135_warmup_task(
    sensor: &'static Mutex<NoopRawMutex, BoardSensor>,
    config: AppConfig,
    led_sender: Sender<'static, NoopRawMutex, LedCommand, 4>,
) {
    info!("Starting MQ135 preheat ({} s)…", config.warmup_secs);
    led_sender.send(LedCommand::Solid(true)).await;

    for i in 1..=config.warmup_secs {
        // RZero drifts down while the heater settles; log it to show progress
        match sensor.lock().await.read_rzero() {
            Ok(rzero) => info!("  Preheat {}/{}: RZero estimate {} kOhm", i, config.warmup_secs, rzero),
            Err(e) => warn!("  Preheat {}/{}: read failed: {}", i, config.warmup_secs, e),
        }

        // wait 1 s between preheat readings
        Timer::after(Duration::from_secs(1)).await;
    }

    // ── calibrate ─────────────────────────────────────────────────────────────
    let (temperature, humidity) = config.ambient();
    info!(
        "Calibrating RZero against {} ppm at {} C / {} %RH…",
        config.calibration_ppm, temperature, humidity
    );
    led_sender.send(LedCommand::Blink(Some(100))).await;

    let result = sensor
        .lock()
        .await
        .calibrate_rzero_async(config.calibration_ppm, temperature, humidity, &mut EmbassyYield)
        .await;

    match result {
        Ok(report) if report.is_success() => {
            info!("RZero calibrated: {} kOhm", report.rzero);
            led_sender.send(LedCommand::Solid(false)).await;
        }
        Ok(report) => {
            warn!(
                "Calibration did not converge, continuing with RZero = {} kOhm",
                report.rzero
            );
            led_sender.send(LedCommand::Solid(true)).await;
        }
        Err(e) => {
            error!("Calibration aborted: {}", e);
            led_sender.send(LedCommand::Blink(None)).await;
        }
    }

    // Signal completion.
    WARMUP_DONE.store(true, Ordering::Release);
    info!("Warm-up complete!");
}

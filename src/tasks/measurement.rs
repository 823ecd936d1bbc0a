use core::sync::atomic::Ordering;
use defmt::{error, info, warn};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};

use crate::air_quality::AirQuality;
use crate::config::AppConfig;
use crate::hal::BoardSensor;
use crate::led::LedCommand;
use crate::tasks::warmup::WARMUP_DONE;

#[embassy_executor::task]
pub async fn mq135_measurement_task(
    sensor: &'static Mutex<NoopRawMutex, BoardSensor>,
    config: AppConfig,
    led_sender: Sender<'static, NoopRawMutex, LedCommand, 4>,
) {
    // Wait until warm-up has calibrated the sensor.
    while !WARMUP_DONE.load(Ordering::Acquire) {
        Timer::after(Duration::from_millis(100)).await;
    }

    info!("Starting normal measurements…");
    let (temperature, humidity) = config.ambient();

    loop {
        let reading = {
            let mut guard = sensor.lock().await;
            if config.compensate {
                guard.read_corrected_ppm(temperature, humidity)
            } else {
                guard.read_ppm()
            }
        };

        let ppm = match reading {
            Ok(ppm) => ppm,
            Err(e) => {
                error!("Failed to read MQ135: {}", e);
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };

        let quality = AirQuality::from_ppm(ppm);
        info!("CO2: {} ppm ({})", ppm, quality.as_str());
        if quality == AirQuality::Poor {
            warn!("High CO2 levels detected!");
        }

        led_sender.send(LedCommand::for_air_quality(quality)).await;
        Timer::after(Duration::from_secs(config.measurement_interval_secs as u64)).await;
    }
}

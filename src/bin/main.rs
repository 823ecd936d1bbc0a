#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::timer::systimer::SystemTimer;
use esp_mq135_co2::config::AppConfig;
use esp_mq135_co2::hal::{BoardCalibration, BoardSensor, EspAdcSampler, Mq135Channel};
use esp_mq135_co2::led::{Led, LedCommand};
use esp_mq135_co2::tasks::led::led_task;
use esp_mq135_co2::tasks::measurement::mq135_measurement_task;
use esp_mq135_co2::tasks::warmup::mq135_warmup_task;
use esp_mq135_co2::Mq135;
use panic_rtt_target as _;
use static_cell::StaticCell;

// ── shared state between the tasks ───────────────────────────────────────────
static SENSOR_CELL: StaticCell<Mutex<NoopRawMutex, BoardSensor>> = StaticCell::new();
static LED_CHANNEL: StaticCell<Channel<NoopRawMutex, LedCommand, 4>> = StaticCell::new();

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    rtt_target::rtt_init_defmt!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);

    info!("Embassy initialized!");

    let app = AppConfig::default();
    info!("{}", app);

    // ADC1 with curve-fitting calibration; 11 dB attenuation covers 0-2.45 V.
    // Sensor AO on GPIO2, reference divider on GPIO3.
    let mut adc_config = AdcConfig::new();
    let sensor_pin =
        adc_config.enable_pin_with_cal::<_, BoardCalibration>(peripherals.GPIO2, Attenuation::_11dB);
    let reference_pin =
        adc_config.enable_pin_with_cal::<_, BoardCalibration>(peripherals.GPIO3, Attenuation::_11dB);
    let adc = Adc::new(peripherals.ADC1, adc_config);

    let mut sensor: BoardSensor = Mq135::new(
        EspAdcSampler::new(adc, sensor_pin, reference_pin),
        Mq135Channel::Sensor,
    );

    // Test the analog path before handing the sensor to the tasks
    info!("Testing MQ135 connection...");
    match sensor.read_resistance() {
        Ok(rs) if rs.is_finite() => info!("MQ135 connected! Rs = {} kOhm", rs),
        Ok(_) => {
            error!("MQ135 output reads 0 V");
            error!(
                "Check connections: AO=GPIO{}, REF=GPIO{}, VCC=5V, GND=GND",
                app.sensor_gpio, app.reference_gpio
            );
        }
        Err(e) => error!("Failed to read MQ135: {}", e),
    }

    // Status LED on GPIO15
    let led = Led::new_gpio(Output::new(
        peripherals.GPIO15,
        Level::Low,
        OutputConfig::default(),
    ));

    let led_channel = LED_CHANNEL.init(Channel::new());
    let sensor = SENSOR_CELL.init(Mutex::new(sensor));

    // Warm-up calibrates first; measurements start once it signals completion.
    spawner.spawn(led_task(led_channel.receiver(), led)).unwrap();
    spawner
        .spawn(mq135_warmup_task(sensor, app, led_channel.sender()))
        .unwrap();
    spawner
        .spawn(mq135_measurement_task(sensor, app, led_channel.sender()))
        .unwrap();

    // Nothing else to do here; park the main task.
    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}

use defmt::info;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Receiver;

use crate::led::Led;
use crate::led::LedCommand;

#[embassy_executor::task]
pub async fn led_task(led_receiver: Receiver<'static, NoopRawMutex, LedCommand, 4>, mut led: Led) {
    let mut blinking: Option<Option<u16>> = None;
    loop {
        // Keep blinking until a new command arrives
        let command = match blinking {
            Some(period_ms) => match led_receiver.try_receive() {
                Ok(command) => command,
                Err(_) => {
                    led.blink(period_ms).await;
                    continue;
                }
            },
            None => led_receiver.receive().await,
        };

        match command {
            LedCommand::Solid(on) => {
                info!("Setting LED solid: on={}", on);
                blinking = None;
                led.set(on);
            }
            LedCommand::Blink(period_ms) => {
                info!("Setting LED to blink: Period={}ms", period_ms);
                blinking = Some(period_ms);
            }
        }
    }
}

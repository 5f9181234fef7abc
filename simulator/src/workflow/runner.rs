use crate::generator::profile::{GeneratorConfig, SyntheticSource};
use crate::gui_bridge::bridge::GuiBridge;
use crate::workflow::config::ReceiverConfig;
use anyhow::Context;
use fmcwcore::ingest::{unix_time_s, Datagram, DatagramQueue};
use fmcwcore::telemetry::PacketCounters;
use fmcwcore::{Pipeline, PipelineSnapshot, RadarParameters};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Owns the datagram queue and drives the pipeline from it.
pub struct Runner {
    config: ReceiverConfig,
    counters: Arc<PacketCounters>,
    queue: Arc<DatagramQueue>,
}

impl Runner {
    pub fn new(config: ReceiverConfig) -> Self {
        let counters = Arc::new(PacketCounters::new());
        let queue = Arc::new(DatagramQueue::new(config.queue_capacity, counters.clone()));
        Self {
            config,
            counters,
            queue,
        }
    }

    fn build_pipeline(&self) -> Pipeline {
        Pipeline::new(&self.config.pipeline, self.counters.clone())
    }

    /// Feeds `cycles` synthetic frame intervals through the queue without sockets.
    pub fn run_offline(&self, cycles: usize) -> anyhow::Result<PipelineSnapshot> {
        let mut pipeline = self.build_pipeline();
        let mut source =
            SyntheticSource::new(self.config.generator.clone(), self.config.pipeline.radar);
        let interval_s = source.config().frame_interval_s();

        let mut snapshot = pipeline.snapshot();
        for cycle in 0..cycles {
            let now_s = cycle as f64 * interval_s;
            let datagrams = source
                .next_datagrams(now_s)
                .with_context(|| format!("generating cycle {}", cycle))?;
            for payload in datagrams {
                self.queue.push(Datagram::new(now_s, payload));
            }
            snapshot = pipeline.tick(&self.queue);
        }
        Ok(snapshot)
    }

    /// Receives on the configured address until Ctrl+C.
    pub async fn run(&self, bridge: GuiBridge) -> anyhow::Result<()> {
        let socket = UdpSocket::bind(self.config.bind_addr)
            .await
            .with_context(|| format!("binding UDP socket {}", self.config.bind_addr))?;
        let shutdown = async {
            if let Err(err) = signal::ctrl_c().await {
                log::warn!("Ctrl+C handler failed: {}", err);
            }
        };
        self.run_until(socket, bridge, shutdown).await
    }

    pub async fn run_until<F>(
        &self,
        socket: UdpSocket,
        bridge: GuiBridge,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = socket.local_addr().context("reading bound address")?;
        bridge.publish_status(&format!("receiving on {}", local));
        let receiver = spawn_receiver(socket, self.queue.clone(), self.config.max_datagram_len);

        let mut pipeline = self.build_pipeline();
        let mut ticker = time::interval(Duration::from_millis(self.config.tick_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = std::pin::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if bridge.take_clear_request() {
                        pipeline.clear();
                        self.counters.reset();
                    }
                    let snapshot = pipeline.tick(&self.queue);
                    if let Err(err) = bridge.publish(snapshot) {
                        break Err(err);
                    }
                }
                _ = &mut shutdown => break Ok(()),
            }
        };

        receiver.abort();
        bridge.publish_status("receiver stopped");
        result
    }
}

fn spawn_receiver(
    socket: UdpSocket,
    queue: Arc<DatagramQueue>,
    max_datagram_len: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; max_datagram_len.max(4)];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    log::trace!("{} bytes from {}", len, peer);
                    queue.push(Datagram::now(buf[..len].to_vec()));
                }
                Err(err) => log::warn!("UDP receive failed: {}", err),
            }
        }
    })
}

/// Streams synthetic datagrams to `target` until Ctrl+C or `frames` are sent.
pub async fn run_generator(
    config: GeneratorConfig,
    radar: RadarParameters,
    target: SocketAddr,
    frames: Option<u64>,
) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
        .await
        .context("binding generator socket")?;
    let mut ticker = time::interval(Duration::from_millis(config.frame_interval_ms.max(1)));
    let mut source = SyntheticSource::new(config, radar);
    let mut sent = 0u64;
    log::info!("streaming synthetic telemetry to {}", target);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for payload in source.next_datagrams(unix_time_s())? {
                    socket
                        .send_to(&payload, target)
                        .await
                        .with_context(|| format!("sending to {}", target))?;
                }
                sent += 1;
                if frames.map_or(false, |limit| sent >= limit) {
                    break;
                }
            }
            _ = signal::ctrl_c() => break,
        }
    }
    log::info!("sent {} synthetic frames", sent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmcwcore::protocol::{encode_targets, TargetTrack, TargetTrackData};

    fn offline_runner() -> Runner {
        Runner::new(ReceiverConfig::default())
    }

    #[test]
    fn runner_executes_offline_cycles() {
        let snapshot = offline_runner().run_offline(20).unwrap();
        assert_eq!(snapshot.tracked, 3);
        assert_eq!(snapshot.counters.received, 40);
        assert_eq!(snapshot.counters.decoded_raw_adc, 20);
        assert_eq!(snapshot.counters.dropped_total(), 0);
        assert_eq!(snapshot.frame.as_ref().map(|f| f.frame_number), Some(20));
        assert!(snapshot.spectrum.is_some());
        for rate in &snapshot.range_rates {
            assert!(
                (rate.range_rate_mps - 1.5).abs() < 1e-2,
                "track {} rate {}",
                rate.target_id,
                rate.range_rate_mps
            );
        }
    }

    #[test]
    fn offline_legacy_text_reaches_pipeline() {
        let mut config = ReceiverConfig::default();
        config.generator.legacy_text = true;
        config.generator.samples_per_chirp = 32;
        let snapshot = Runner::new(config).run_offline(3).unwrap();
        assert_eq!(snapshot.tracked, 3);
        assert_eq!(snapshot.frame.map(|f| f.sample_count), Some(32));
    }

    #[test]
    fn zero_cycles_yield_empty_snapshot() {
        let snapshot = offline_runner().run_offline(0).unwrap();
        assert_eq!(snapshot, PipelineSnapshot::default());
    }

    #[tokio::test]
    async fn udp_datagrams_reach_bridge() {
        let config = ReceiverConfig {
            tick_ms: 10,
            ..Default::default()
        };
        let runner = Runner::new(config);
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let data = TargetTrackData::new(vec![TargetTrack::new(7, 25.0)]);
        sender
            .send_to(&encode_targets(&data).unwrap(), addr)
            .await
            .unwrap();
        sender.send_to(&[0x02, 0, 0], addr).await.unwrap();

        let bridge = GuiBridge::new();
        runner
            .run_until(socket, bridge.clone(), time::sleep(Duration::from_millis(300)))
            .await
            .unwrap();

        let model = bridge.snapshot();
        assert!(model.ticks > 0);
        assert_eq!(model.snapshot.tracked, 1);
        assert_eq!(model.snapshot.counters.received, 2);
        assert_eq!(model.snapshot.counters.dropped_truncated, 1);
        assert_eq!(model.status, "receiver stopped");
    }
}

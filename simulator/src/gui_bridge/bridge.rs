use crate::gui_bridge::model::VisualizationModel;
use anyhow::{anyhow, Result};
use fmcwcore::ingest::unix_time_s;
use fmcwcore::PipelineSnapshot;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use warp::{http::StatusCode, Filter};

/// Shares the latest pipeline state with HTTP pollers and relays clear requests.
#[derive(Clone, Default)]
pub struct GuiBridge {
    state: Arc<RwLock<VisualizationModel>>,
    clear_requested: Arc<AtomicBool>,
}

impl GuiBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone + Send + Sync + 'static
    {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let clear = self.clear_requested.clone();
        let clear_filter = warp::any().map(move || clear.clone());

        let snapshot_route = warp::path("snapshot")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: Arc<RwLock<VisualizationModel>>| {
                let model = state.read().map(|g| g.clone()).unwrap_or_default();
                warp::reply::json(&model)
            });

        let counters_route = warp::path("counters")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<VisualizationModel>>| {
                let counters = state
                    .read()
                    .map(|g| g.snapshot.counters)
                    .unwrap_or_default();
                warp::reply::json(&counters)
            });

        let clear_route = warp::path("clear")
            .and(warp::path::end())
            .and(warp::post())
            .and(clear_filter)
            .map(|flag: Arc<AtomicBool>| {
                flag.store(true, Ordering::SeqCst);
                warp::reply::with_status(
                    warp::reply::json(&json!({"status": "clear requested"})),
                    StatusCode::ACCEPTED,
                )
            });

        snapshot_route.or(counters_route).or(clear_route)
    }

    /// Serves [`GuiBridge::routes`] on `addr` from the current runtime.
    pub fn serve(&self, addr: SocketAddr) -> JoinHandle<()> {
        let routes = self.routes();
        log::info!("HTTP bridge listening on {}", addr);
        tokio::spawn(warp::serve(routes).run(addr))
    }

    pub fn publish(&self, snapshot: PipelineSnapshot) -> Result<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| anyhow!("bridge state lock poisoned"))?;
        guard.ticks += 1;
        guard.updated_at_s = unix_time_s();
        guard.snapshot = snapshot;
        log::debug!(
            "published tick {}: {} tracks, {} dropped",
            guard.ticks,
            guard.snapshot.tracked,
            guard.snapshot.counters.dropped_total()
        );
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        log::info!("{}", message);
        if let Ok(mut guard) = self.state.write() {
            guard.status = message.to_string();
        }
    }

    /// Returns whether a clear was requested since the last call.
    pub fn take_clear_request(&self) -> bool {
        self.clear_requested.swap(false, Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> VisualizationModel {
        self.state.read().map(|g| g.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmcwcore::telemetry::CounterSnapshot;

    fn published_bridge() -> GuiBridge {
        let bridge = GuiBridge::new();
        let snapshot = PipelineSnapshot {
            tracked: 4,
            counters: CounterSnapshot {
                received: 9,
                dropped_overflow: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        bridge.publish(snapshot).unwrap();
        bridge.publish_status("receiving");
        bridge
    }

    #[test]
    fn gui_bridge_updates_state() {
        let bridge = published_bridge();
        let model = bridge.snapshot();
        assert_eq!(model.ticks, 1);
        assert_eq!(model.snapshot.tracked, 4);
        assert_eq!(model.status, "receiving");
    }

    #[tokio::test]
    async fn snapshot_route_serves_flattened_model() {
        let bridge = published_bridge();
        let res = warp::test::request()
            .method("GET")
            .path("/snapshot")
            .reply(&bridge.routes())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["tracked"], 4);
        assert_eq!(body["status"], "receiving");
        assert!(body["spectrum"].is_null());
    }

    #[tokio::test]
    async fn counters_route_serves_counters() {
        let bridge = published_bridge();
        let res = warp::test::request()
            .method("GET")
            .path("/counters")
            .reply(&bridge.routes())
            .await;
        let body: CounterSnapshot = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.received, 9);
        assert_eq!(body.dropped_overflow, 2);
    }

    #[tokio::test]
    async fn clear_route_raises_flag_once() {
        let bridge = GuiBridge::new();
        assert!(!bridge.take_clear_request());
        let res = warp::test::request()
            .method("POST")
            .path("/clear")
            .reply(&bridge.routes())
            .await;
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert!(bridge.take_clear_request());
        assert!(!bridge.take_clear_request());
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let bridge = GuiBridge::new();
        let res = warp::test::request()
            .method("GET")
            .path("/clear")
            .reply(&bridge.routes())
            .await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

//! Single-threaded event loop around an [`Orchestrator`].
//!
//! Pose updates and clouds arrive on one channel and are handled strictly in
//! arrival order, so a cycle always sees the last pose received before its
//! cloud.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{unbounded, Receiver, SendError, Sender};
use pcd_core::{
    geometry::{vector::Vector3, Pose},
    pointcloud::{grid::ElevationGrid, point::LabeledCloud},
};

use crate::{
    error::SegmentationError,
    orchestrator::{Cycle, Orchestrator},
};

#[derive(Debug, Clone)]
pub enum Event {
    Pose(Pose),
    /// Cloud segmented from the current robot pose.
    Cloud(Arc<LabeledCloud>),
    /// Cloud with an explicit sensor placement, as in offline test cases.
    CloudWithSensor {
        cloud: Arc<LabeledCloud>,
        origin: Vector3,
        look_direction: Vector3,
    },
    Grid(ElevationGrid),
}

/// Receives the outcome of every cycle the worker runs.
pub trait CycleSink: Send {
    fn on_cycle(&mut self, cycle: &Cycle);

    fn on_error(&mut self, error: &SegmentationError) {
        log::warn!("cycle skipped: {}", error);
    }
}

pub struct SegmentationWorker {
    sender: Sender<Event>,
    handle: JoinHandle<Orchestrator>,
}

impl SegmentationWorker {
    pub fn spawn(orchestrator: Orchestrator, sink: Box<dyn CycleSink>) -> io::Result<Self> {
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("plane-seg".into())
            .spawn(move || {
                let mut orchestrator = orchestrator;
                let mut sink = sink;
                run_event_loop(&mut orchestrator, receiver, sink.as_mut());
                orchestrator
            })?;

        Ok(Self { sender, handle })
    }

    /// A new handle for producers on other threads.
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    pub fn submit(&self, event: Event) -> Result<(), SendError<Event>> {
        self.sender.send(event)
    }

    /// Drains the queue and hands the orchestrator back. Blocks until every
    /// sender obtained through [`SegmentationWorker::sender`] is dropped too.
    pub fn shutdown(self) -> thread::Result<Orchestrator> {
        drop(self.sender);
        self.handle.join()
    }
}

pub fn run_event_loop(
    orchestrator: &mut Orchestrator,
    events: Receiver<Event>,
    sink: &mut dyn CycleSink,
) {
    log::info!("segmentation worker started");

    for event in events {
        let outcome = match event {
            Event::Pose(pose) => {
                if let Err(e) = orchestrator.update_pose(pose) {
                    log::warn!("ignoring pose update: {}", e);
                }
                continue;
            }
            Event::Cloud(cloud) => orchestrator.process_with_current_pose(cloud),
            Event::CloudWithSensor {
                cloud,
                origin,
                look_direction,
            } => orchestrator.process_cloud(cloud, origin, look_direction),
            Event::Grid(grid) => {
                let cloud = grid.to_cloud();
                log::debug!(
                    "converted {}x{} grid into {} points",
                    grid.size[0],
                    grid.size[1],
                    cloud.len()
                );
                orchestrator.process_with_current_pose(Arc::new(cloud))
            }
        };

        match outcome {
            Ok(cycle) => sink.on_cycle(&cycle),
            Err(e) => sink.on_error(&e),
        }
    }

    log::info!(
        "segmentation worker stopped after {} cycles",
        orchestrator.cycle_count()
    );
}

use std::path::{Path, PathBuf};

use pcd_core::pointcloud::point::LabeledCloud;

use crate::{parsers::parser_for, ParseError};

/// A recorded dataset used for offline runs, with the sensor placement it was
/// captured from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestCase {
    pub id: u8,
    pub description: &'static str,
    pub relative_path: &'static str,
    pub origin: [f64; 3],
    pub look_direction: [f64; 3],
}

const ANYMAL_ORIGIN: [f64; 3] = [-0.028775, -0.005776, 0.987898];
const ANYMAL_LOOK: [f64; 3] = [0.999956, -0.005003, 0.007958];

pub const TEST_CASES: [TestCase; 6] = [
    TestCase {
        id: 0,
        description: "tilted steps",
        relative_path: "terrain/tilted-steps.pcd",
        origin: [0.248091, 0.012443, 1.806473],
        look_direction: [0.837001, 0.019831, -0.546842],
    },
    TestCase {
        id: 1,
        description: "terrain, medium range",
        relative_path: "terrain/terrain_med.pcd",
        origin: [-0.028862, -0.007466, 0.087855],
        look_direction: [0.999890, -0.005120, -0.013947],
    },
    TestCase {
        id: 2,
        description: "terrain, close rectangle",
        relative_path: "terrain/terrain_close_rect.pcd",
        origin: [-0.028775, -0.005776, 0.087898],
        look_direction: [0.999956, -0.005003, 0.007958],
    },
    TestCase {
        id: 3,
        description: "entrance stair climb",
        relative_path: "terrain/anymal/ori_entrance_stair_climb/06.pcd",
        origin: ANYMAL_ORIGIN,
        look_direction: ANYMAL_LOOK,
    },
    TestCase {
        id: 4,
        description: "race arena, cross plane ramps",
        relative_path: "leica/race_arenas/RACE_crossplaneramps_sub1cm_cropped_meshlab_icp.ply",
        origin: ANYMAL_ORIGIN,
        look_direction: ANYMAL_LOOK,
    },
    TestCase {
        id: 5,
        description: "race arena, step field",
        relative_path: "leica/race_arenas/RACE_stepfield_sub1cm_cropped_meshlab_icp.ply",
        origin: ANYMAL_ORIGIN,
        look_direction: ANYMAL_LOOK,
    },
];

impl TestCase {
    pub fn from_id(id: u8) -> Result<&'static TestCase, ParseError> {
        TEST_CASES
            .iter()
            .find(|case| case.id == id)
            .ok_or(ParseError::UnknownTestCase(id))
    }

    pub fn path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.relative_path)
    }

    pub fn load(&self, data_dir: &Path) -> Result<LabeledCloud, ParseError> {
        let path = self.path(data_dir);
        log::info!("loading test case {} ({}) from {:?}", self.id, self.description, path);
        parser_for(vec![path])?.parse()
    }
}

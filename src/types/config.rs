use eyre::Result;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs;

/// Full arm description: kinematic chain constants, joint limits, control
/// step sizes, and preset postures. A hand-written `Default` carries the
/// baked-in constants; `load_from_file` lets deployments override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    pub name: String,
    pub dof: usize,
    pub joint_limits: Vec<JointLimit>,
    pub kinematics: KinematicsConfig,
    pub control: ControlConfig,
    pub presets: PresetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointLimit {
    pub min_angle: f64,
    pub max_angle: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicsConfig {
    /// Space-frame screw axes at the home configuration, one per joint,
    /// each `[wx, wy, wz, vx, vy, vz]`.
    pub screw_axes: Vec<[f64; 6]>,
    /// End-effector position at the home configuration.
    pub home_position: [f64; 3],
    /// End-effector roll/pitch/yaw at the home configuration.
    pub home_orientation_rpy: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub tick_rate_hz: f64,
    /// Base end-effector translation step per tick (meters), scaled by the
    /// runtime speed scale.
    pub translate_step: f64,
    /// Base roll/pitch step per tick (radians), scaled by the speed scale.
    pub rotate_step: f64,
    /// Base waist rotation step per tick (radians), scaled by the speed scale.
    pub waist_step: f64,
    /// Gripper spacing step per tick (meters), not speed-scaled.
    pub gripper_step: f64,
    pub gripper_min: f64,
    pub gripper_max: f64,
    /// Initial runtime speed scale.
    pub speed_scale: f64,
    /// Multiplicative factor applied per speed up/down press.
    pub speed_scale_factor: f64,
    pub speed_scale_min: f64,
    pub speed_scale_max: f64,
    /// Lateral (y) deltas are only honored while the working transform's
    /// x-translation exceeds this, keeping sideways motion away from the
    /// base column.
    pub lateral_guard_x: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetConfig {
    pub home: Vec<f64>,
    pub sleep: Vec<f64>,
    pub upright: Vec<f64>,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            name: "reach_6dof".to_string(),
            dof: 6,
            // waist, shoulder, elbow, forearm roll, wrist pitch, wrist roll
            joint_limits: vec![
                JointLimit { min_angle: -PI, max_angle: PI },
                JointLimit { min_angle: -1.88, max_angle: 1.99 },
                JointLimit { min_angle: -2.15, max_angle: 1.61 },
                JointLimit { min_angle: -PI, max_angle: PI },
                JointLimit { min_angle: -1.75, max_angle: 2.15 },
                JointLimit { min_angle: -PI, max_angle: PI },
            ],
            kinematics: KinematicsConfig {
                // Home configuration: shoulder at 0.11 m, upper arm (0.25 m)
                // vertical, forearm (0.25 m) and wrist link (0.15 m) along +x.
                // The bent elbow keeps the zero posture well inside the reach
                // envelope.
                screw_axes: vec![
                    [0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0, -0.11, 0.0, 0.0],
                    [0.0, 1.0, 0.0, -0.36, 0.0, 0.0],
                    [1.0, 0.0, 0.0, 0.0, 0.36, 0.0],
                    [0.0, 1.0, 0.0, -0.36, 0.0, 0.25],
                    [1.0, 0.0, 0.0, 0.0, 0.36, 0.0],
                ],
                home_position: [0.40, 0.0, 0.36],
                home_orientation_rpy: [0.0, 0.0, 0.0],
            },
            control: ControlConfig {
                tick_rate_hz: 15.0,
                translate_step: 0.001,
                rotate_step: 0.005,
                waist_step: 0.01,
                gripper_step: 0.002,
                gripper_min: -0.03,
                gripper_max: 0.0,
                speed_scale: 1.0,
                speed_scale_factor: 1.25,
                speed_scale_min: 0.1,
                speed_scale_max: 4.0,
                lateral_guard_x: 0.3,
            },
            presets: PresetConfig {
                home: vec![0.0; 6],
                sleep: vec![0.0, -1.80, 1.55, 0.0, 0.8, 0.0],
                upright: vec![0.0, 0.0, -1.0, 0.0, 1.0, 0.0],
            },
        }
    }
}

impl ArmConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ArmConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dof != 6 {
            return Err(eyre::eyre!("only 6-DOF arms are supported, got {}", self.dof));
        }

        if self.joint_limits.len() != self.dof {
            return Err(eyre::eyre!(
                "joint limits count ({}) doesn't match DOF ({})",
                self.joint_limits.len(),
                self.dof
            ));
        }

        if self.kinematics.screw_axes.len() != self.dof {
            return Err(eyre::eyre!(
                "screw axes count ({}) doesn't match DOF ({})",
                self.kinematics.screw_axes.len(),
                self.dof
            ));
        }

        for (i, limit) in self.joint_limits.iter().enumerate() {
            if limit.min_angle >= limit.max_angle {
                return Err(eyre::eyre!(
                    "joint {} limits are inverted: [{:.3}, {:.3}]",
                    i,
                    limit.min_angle,
                    limit.max_angle
                ));
            }
        }

        for (name, preset) in [
            ("home", &self.presets.home),
            ("sleep", &self.presets.sleep),
            ("upright", &self.presets.upright),
        ] {
            if preset.len() != self.dof {
                return Err(eyre::eyre!(
                    "preset '{}' has {} joints, expected {}",
                    name,
                    preset.len(),
                    self.dof
                ));
            }
            for (i, &angle) in preset.iter().enumerate() {
                let limit = &self.joint_limits[i];
                if angle < limit.min_angle || angle > limit.max_angle {
                    return Err(eyre::eyre!(
                        "preset '{}' joint {} angle {:.3} outside limits [{:.3}, {:.3}]",
                        name,
                        i,
                        angle,
                        limit.min_angle,
                        limit.max_angle
                    ));
                }
            }
        }

        if self.control.tick_rate_hz <= 0.0 {
            return Err(eyre::eyre!("tick rate must be positive"));
        }
        if self.control.gripper_min > self.control.gripper_max {
            return Err(eyre::eyre!("gripper range is inverted"));
        }
        if self.control.speed_scale_min > self.control.speed_scale_max {
            return Err(eyre::eyre!("speed scale range is inverted"));
        }
        if self.control.speed_scale < self.control.speed_scale_min
            || self.control.speed_scale > self.control.speed_scale_max
        {
            return Err(eyre::eyre!(
                "initial speed scale {:.2} outside [{:.2}, {:.2}]",
                self.control.speed_scale,
                self.control.speed_scale_min,
                self.control.speed_scale_max
            ));
        }

        Ok(())
    }
}

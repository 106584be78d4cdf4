//! Flow quantities derived from Plot3D solution files
//!
//! Everything is computed per point from the conserved variables of a [`QBlock`]:
//! density `ρ`, momentum `m` and stagnation energy `e`. A zero density is treated as
//! `1` so that empty regions of a solution do not produce infinities.
//!
//! Spatial derivatives are taken with central differences in computational (`i, j, k`)
//! space, one sided at block boundaries, and mapped to physical space through the
//! inverse of the grid Jacobian.

use super::format::QBlock;
use crate::prelude::*;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A quantity that can be computed from a solution file, identified on the wire by its
/// numeric id (see [`Plot3DFunction::id`]).
pub enum Plot3DFunction {
    Density,
    Pressure,
    PressureCoefficient,
    MachNumber,
    SoundSpeed,
    Temperature,
    Enthalpy,
    InternalEnergy,
    KineticEnergy,
    VelocityMagnitude,
    StagnationEnergy,
    Entropy,
    Swirl,
    Velocity,
    Vorticity,
    Momentum,
    PressureGradient,
    VorticityMagnitude,
    StrainRate,
}

use Plot3DFunction as F;

impl Plot3DFunction {
    pub const ALL: [Plot3DFunction; 19] = [
        F::Density,
        F::Pressure,
        F::PressureCoefficient,
        F::MachNumber,
        F::SoundSpeed,
        F::Temperature,
        F::Enthalpy,
        F::InternalEnergy,
        F::KineticEnergy,
        F::VelocityMagnitude,
        F::StagnationEnergy,
        F::Entropy,
        F::Swirl,
        F::Velocity,
        F::Vorticity,
        F::Momentum,
        F::PressureGradient,
        F::VorticityMagnitude,
        F::StrainRate,
    ];

    pub fn id(&self) -> i32 {
        match self {
            F::Density => 100,
            F::Pressure => 110,
            F::PressureCoefficient => 111,
            F::MachNumber => 112,
            F::SoundSpeed => 113,
            F::Temperature => 120,
            F::Enthalpy => 130,
            F::InternalEnergy => 140,
            F::KineticEnergy => 144,
            F::VelocityMagnitude => 153,
            F::StagnationEnergy => 163,
            F::Entropy => 170,
            F::Swirl => 184,
            F::Velocity => 200,
            F::Vorticity => 201,
            F::Momentum => 202,
            F::PressureGradient => 210,
            F::VorticityMagnitude => 211,
            F::StrainRate => 212,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.id() as i64 == id)
    }

    /// name of the point array the function produces
    pub fn name(&self) -> &'static str {
        match self {
            F::Density => "Density",
            F::Pressure => "Pressure",
            F::PressureCoefficient => "PressureCoefficient",
            F::MachNumber => "MachNumber",
            F::SoundSpeed => "SoundSpeed",
            F::Temperature => "Temperature",
            F::Enthalpy => "Enthalpy",
            F::InternalEnergy => "InternalEnergy",
            F::KineticEnergy => "KineticEnergy",
            F::VelocityMagnitude => "VelocityMagnitude",
            F::StagnationEnergy => "StagnationEnergy",
            F::Entropy => "Entropy",
            F::Swirl => "Swirl",
            F::Velocity => "Velocity",
            F::Vorticity => "Vorticity",
            F::Momentum => "Momentum",
            F::PressureGradient => "PressureGradient",
            F::VorticityMagnitude => "VorticityMagnitude",
            F::StrainRate => "StrainRate",
        }
    }

    /// functions that are computed first and reused
    pub fn dependencies(&self) -> &'static [Plot3DFunction] {
        match self {
            F::Temperature | F::SoundSpeed | F::Entropy | F::PressureCoefficient | F::PressureGradient => {
                &[F::Pressure]
            }
            F::Enthalpy
            | F::InternalEnergy
            | F::KineticEnergy
            | F::VelocityMagnitude
            | F::Vorticity
            | F::StrainRate => &[F::Velocity],
            F::MachNumber => &[F::Velocity, F::SoundSpeed],
            F::Swirl => &[F::Velocity, F::Vorticity],
            F::VorticityMagnitude => &[F::Vorticity],
            F::Density | F::Pressure | F::StagnationEnergy | F::Velocity | F::Momentum => &[],
        }
    }

    fn needs_gradient(&self) -> bool {
        matches!(self, F::Vorticity | F::StrainRate | F::PressureGradient)
    }
}

impl fmt::Display for Plot3DFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// Gas properties and free stream conditions
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GasModel {
    pub gamma: f64,
    pub r: f64,
    pub fsmach: f64,
}

type Matrix = [[f64; 3]; 3];

pub(crate) struct FlowField<'a> {
    dims: [usize; 3],
    points: &'a Array2<f64>,
    q: &'a QBlock,
    gas: GasModel,
    cache: BTreeMap<Plot3DFunction, Array2<f64>>,
    /// inverse grid metrics, one per point, computed on first use
    metrics: Option<Vec<Matrix>>,
}

impl<'a> FlowField<'a> {
    pub(crate) fn new(dims: [usize; 3], points: &'a Array2<f64>, q: &'a QBlock, gas: GasModel) -> Self {
        Self {
            dims,
            points,
            q,
            gas,
            cache: BTreeMap::new(),
            metrics: None,
        }
    }

    /// Compute every requested function. Intermediate results are only part of the
    /// output when `preserve_intermediate` is set.
    pub(crate) fn compute(
        mut self,
        requested: &BTreeSet<Plot3DFunction>,
        preserve_intermediate: bool,
    ) -> Vec<DataArray> {
        for function in requested {
            self.evaluate(*function);
        }

        self.cache
            .into_iter()
            .filter(|(function, _)| preserve_intermediate || requested.contains(function))
            .map(|(function, values)| DataArray::from_array(function.name(), values))
            .collect()
    }

    fn evaluate(&mut self, function: Plot3DFunction) {
        if self.cache.contains_key(&function) {
            return;
        }

        for dependency in function.dependencies() {
            self.evaluate(*dependency);
        }

        if function.needs_gradient() && self.metrics.is_none() {
            self.metrics = Some(inverse_metrics(self.points, self.dims));
        }

        let values = self.values_of(function);
        self.cache.insert(function, values);
    }

    fn n(&self) -> usize {
        self.q.density.len()
    }

    fn rho(&self, i: usize) -> f64 {
        match self.q.density[i] {
            d if d == 0.0 => 1.0,
            d => d,
        }
    }

    fn get(&self, function: Plot3DFunction) -> &Array2<f64> {
        &self.cache[&function]
    }

    fn scalar<G: Fn(usize) -> f64>(&self, value: G) -> Array2<f64> {
        Array2::from_shape_fn((self.n(), 1), |(i, _)| value(i))
    }

    fn speed_squared(&self, i: usize) -> f64 {
        let u = self.get(F::Velocity).row(i);
        u.dot(&u)
    }

    fn values_of(&self, function: Plot3DFunction) -> Array2<f64> {
        let GasModel { gamma, r, fsmach } = self.gas;
        let q = self.q;

        match function {
            F::Density => self.scalar(|i| q.density[i]),
            F::StagnationEnergy => self.scalar(|i| q.energy[i]),
            F::Momentum => q.momentum.clone(),
            F::Velocity => Array2::from_shape_fn((self.n(), 3), |(i, c)| q.momentum[[i, c]] / self.rho(i)),
            F::Pressure => self.scalar(|i| {
                let m = q.momentum.row(i);
                (gamma - 1.0) * (q.energy[i] - 0.5 * m.dot(&m) / self.rho(i))
            }),
            F::Temperature => {
                let p = self.get(F::Pressure);
                self.scalar(|i| p[[i, 0]] / (self.rho(i) * r))
            }
            F::Enthalpy => self.scalar(|i| gamma * (q.energy[i] / self.rho(i) - 0.5 * self.speed_squared(i))),
            F::InternalEnergy => self.scalar(|i| q.energy[i] / self.rho(i) - 0.5 * self.speed_squared(i)),
            F::KineticEnergy => self.scalar(|i| 0.5 * self.speed_squared(i)),
            F::VelocityMagnitude => self.scalar(|i| self.speed_squared(i).sqrt()),
            F::SoundSpeed => {
                let p = self.get(F::Pressure);
                self.scalar(|i| (gamma * p[[i, 0]] / self.rho(i)).abs().sqrt())
            }
            F::MachNumber => {
                let c = self.get(F::SoundSpeed);
                self.scalar(|i| match c[[i, 0]] {
                    c if c == 0.0 => 0.0,
                    c => self.speed_squared(i).sqrt() / c,
                })
            }
            F::Entropy => {
                let p = self.get(F::Pressure);
                let p_inf = 1.0 / gamma;
                let cv = r / (gamma - 1.0);
                self.scalar(|i| cv * ((p[[i, 0]] / p_inf) / self.rho(i).powf(gamma)).ln())
            }
            F::PressureCoefficient => {
                let p = self.get(F::Pressure);
                let p_inf = 1.0 / gamma;
                let dynamic = 0.5 * fsmach * fsmach;
                self.scalar(|i| {
                    if dynamic == 0.0 {
                        0.0
                    } else {
                        (p[[i, 0]] - p_inf) / dynamic
                    }
                })
            }
            F::Swirl => {
                let u = self.get(F::Velocity);
                let w = self.get(F::Vorticity);
                self.scalar(|i| match self.speed_squared(i) {
                    s if s == 0.0 => 0.0,
                    s => w.row(i).dot(&u.row(i)) / s,
                })
            }
            F::Vorticity => {
                let [du, dv, dw] = self.velocity_gradients();
                Array2::from_shape_fn((self.n(), 3), |(i, c)| match c {
                    0 => dw[[i, 1]] - dv[[i, 2]],
                    1 => du[[i, 2]] - dw[[i, 0]],
                    _ => dv[[i, 0]] - du[[i, 1]],
                })
            }
            F::StrainRate => {
                let gradients = self.velocity_gradients();
                Array2::from_shape_fn((self.n(), 3), |(i, c)| gradients[c][[i, c]])
            }
            F::VorticityMagnitude => {
                let w = self.get(F::Vorticity);
                self.scalar(|i| w.row(i).dot(&w.row(i)).sqrt())
            }
            F::PressureGradient => self.gradient(self.get(F::Pressure).column(0)),
        }
    }

    fn velocity_gradients(&self) -> [Array2<f64>; 3] {
        let u = self.get(F::Velocity);
        [
            self.gradient(u.column(0)),
            self.gradient(u.column(1)),
            self.gradient(u.column(2)),
        ]
    }

    /// `(n_points, 3)` physical gradient of a point scalar
    fn gradient(&self, values: ArrayView1<'_, f64>) -> Array2<f64> {
        let metrics = self.metrics.as_deref().unwrap_or(&[]);
        let [ni, nj, nk] = self.dims;
        let mut out = Array2::zeros((self.n(), 3));

        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    let index = point_index(self.dims, [i, j, k]);
                    let Some(inverse) = metrics.get(index) else {
                        continue;
                    };

                    let computational: [f64; 3] =
                        std::array::from_fn(|axis| derivative(|p| values[p], self.dims, [i, j, k], axis));

                    for (row, c) in inverse.iter().zip(0..3) {
                        out[[index, c]] = row[0] * computational[0]
                            + row[1] * computational[1]
                            + row[2] * computational[2];
                    }
                }
            }
        }

        out
    }
}

/// `i` varies fastest
fn point_index(dims: [usize; 3], at: [usize; 3]) -> usize {
    at[0] + dims[0] * (at[1] + dims[1] * at[2])
}

/// derivative of `f` along one computational axis
fn derivative<G: Fn(usize) -> f64>(f: G, dims: [usize; 3], at: [usize; 3], axis: usize) -> f64 {
    let n = dims[axis];
    if n < 2 {
        return 0.0;
    }

    let value = |position: usize| {
        let mut p = at;
        p[axis] = position;
        f(point_index(dims, p))
    };

    match at[axis] {
        0 => value(1) - value(0),
        c if c == n - 1 => value(c) - value(c - 1),
        c => 0.5 * (value(c + 1) - value(c - 1)),
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length == 0.0 {
        v
    } else {
        [v[0] / length, v[1] / length, v[2] / length]
    }
}

/// Replace the zero tangents of collapsed axes with unit normals so that two and one
/// dimensional blocks still have an invertible Jacobian.
fn complete_basis(mut tangents: Matrix, dims: [usize; 3]) -> Matrix {
    let collapsed: Vec<usize> = (0..3).filter(|axis| dims[*axis] < 2).collect();

    match collapsed.as_slice() {
        [] => (),
        [axis] => {
            let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
            tangents[*axis] = normalize(cross(tangents[a], tangents[b]));
        }
        [first, second] => {
            let tangent = tangents[3 - first - second];
            let helper_axis = (0..3)
                .min_by(|a, b| tangent[*a].abs().total_cmp(&tangent[*b].abs()))
                .unwrap_or(0);
            let mut helper = [0.0; 3];
            helper[helper_axis] = 1.0;

            let normal = normalize(cross(tangent, helper));
            tangents[*first] = normal;
            tangents[*second] = normalize(cross(tangent, normal));
        }
        _ => tangents = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    }

    tangents
}

fn invert(m: &Matrix) -> Option<Matrix> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);

    if det == 0.0 || !det.is_finite() {
        return None;
    }

    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
        ],
    ])
}

/// For every point, the inverse of the matrix whose rows are the grid tangents
/// `∂x/∂i`, `∂x/∂j` and `∂x/∂k`. A degenerate cell yields a zero matrix and therefore
/// zero gradients.
fn inverse_metrics(points: &Array2<f64>, dims: [usize; 3]) -> Vec<Matrix> {
    let [ni, nj, nk] = dims;
    let mut metrics = vec![[[0.0; 3]; 3]; ni * nj * nk];

    for k in 0..nk {
        for j in 0..nj {
            for i in 0..ni {
                let at = [i, j, k];
                let tangents: Matrix = std::array::from_fn(|axis| {
                    std::array::from_fn(|c| derivative(|p| points[[p, c]], dims, at, axis))
                });

                let basis = complete_basis(tangents, dims);
                if let Some(inverse) = invert(&basis) {
                    metrics[point_index(dims, at)] = inverse;
                }
            }
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    /// a cartesian block with spacing `h` and a flow with unit density, velocity
    /// `velocity(x, y, z)` and stagnation energy `2.5`
    fn block<V: Fn(f64, f64, f64) -> [f64; 3]>(dims: [usize; 3], h: f64, velocity: V) -> (Array2<f64>, QBlock) {
        let n = dims.iter().product();
        let mut points = Array2::zeros((n, 3));
        let mut momentum = Array2::zeros((n, 3));

        for k in 0..dims[2] {
            for j in 0..dims[1] {
                for i in 0..dims[0] {
                    let index = point_index(dims, [i, j, k]);
                    let (x, y, z) = (i as f64 * h, j as f64 * h, k as f64 * h);
                    points.row_mut(index).assign(&Array1::from(vec![x, y, z]));
                    momentum.row_mut(index).assign(&Array1::from(velocity(x, y, z).to_vec()));
                }
            }
        }

        let q = QBlock {
            properties: [0.5, 0.0, 1.0e6, 0.0],
            density: vec![1.0; n],
            momentum,
            energy: vec![2.5; n],
        };

        (points, q)
    }

    const AIR: GasModel = GasModel {
        gamma: 1.4,
        r: 1.0,
        fsmach: 0.5,
    };

    fn compute(
        dims: [usize; 3],
        points: &Array2<f64>,
        q: &QBlock,
        functions: &[Plot3DFunction],
        preserve: bool,
    ) -> Vec<DataArray> {
        let requested = functions.iter().copied().collect();
        FlowField::new(dims, points, q, AIR).compute(&requested, preserve)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn ids_round_trip() {
        for function in Plot3DFunction::ALL {
            assert_eq!(Plot3DFunction::from_id(function.id() as i64), Some(function));
        }
        assert_eq!(Plot3DFunction::from_id(144), Some(F::KineticEnergy));
        assert_eq!(Plot3DFunction::from_id(-1), None);
    }

    #[test]
    fn thermodynamic_quantities() {
        let dims = [2, 2, 2];
        let (points, q) = block(dims, 1.0, |_, _, _| [1.0, 0.0, 0.0]);
        let arrays = compute(
            dims,
            &points,
            &q,
            &[F::Pressure, F::Temperature, F::KineticEnergy, F::MachNumber],
            false,
        );

        let names: Vec<&str> = arrays.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Pressure", "MachNumber", "Temperature", "KineticEnergy"]);

        // p = 0.4 * (2.5 - 0.5)
        let pressure = arrays[0].values[[0, 0]];
        assert_close(pressure, 0.8);
        assert_close(arrays[2].values[[3, 0]], 0.8);
        assert_close(arrays[3].values[[5, 0]], 0.5);

        let sound_speed = (1.4f64 * 0.8).sqrt();
        assert_close(arrays[1].values[[7, 0]], 1.0 / sound_speed);
    }

    #[test]
    fn intermediates_are_dropped_unless_preserved() {
        let dims = [3, 3, 3];
        let (points, q) = block(dims, 0.5, |x, y, _| [-y, x, 0.0]);

        let arrays = compute(dims, &points, &q, &[F::Swirl], false);
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays[0].name, "Swirl");

        let arrays = compute(dims, &points, &q, &[F::Swirl], true);
        let names: Vec<&str> = arrays.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Swirl", "Velocity", "Vorticity"]);
    }

    #[test]
    fn vorticity_of_solid_body_rotation() {
        let dims = [3, 3, 3];
        let (points, q) = block(dims, 0.5, |x, y, _| [-y, x, 0.0]);
        let arrays = compute(dims, &points, &q, &[F::Vorticity, F::VorticityMagnitude], false);

        for index in 0..27 {
            assert_close(arrays[0].values[[index, 0]], 0.0);
            assert_close(arrays[0].values[[index, 1]], 0.0);
            assert_close(arrays[0].values[[index, 2]], 2.0);
            assert_close(arrays[1].values[[index, 0]], 2.0);
        }
    }

    #[test]
    fn planar_block_gradients() {
        let dims = [4, 3, 1];
        let (points, q) = block(dims, 0.25, |x, y, _| [-y, x, 0.0]);
        let arrays = compute(dims, &points, &q, &[F::Vorticity], false);

        for index in 0..12 {
            assert_close(arrays[0].values[[index, 2]], 2.0);
        }
    }

    #[test]
    fn strain_rate_diagonal() {
        let dims = [3, 3, 3];
        let (points, q) = block(dims, 1.0, |x, y, z| [x, 2.0 * y, 3.0 * z]);
        let arrays = compute(dims, &points, &q, &[F::StrainRate], false);

        for index in 0..27 {
            let row = arrays[0].values.row(index).to_vec();
            for (value, expected) in row.into_iter().zip([1.0, 2.0, 3.0]) {
                assert_close(value, expected);
            }
        }
    }

    #[test]
    fn zero_density_is_guarded() {
        let dims = [2, 1, 1];
        let (points, mut q) = block(dims, 1.0, |_, _, _| [2.0, 0.0, 0.0]);
        q.density = vec![0.0, 0.0];

        let arrays = compute(dims, &points, &q, &[F::Velocity], false);
        assert_close(arrays[0].values[[0, 0]], 2.0);
        assert!(arrays[0].values.iter().all(|v| v.is_finite()));
    }
}

// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use meshflow::{
    MeshFlowError,
    flow::{
        AccumulationScheme, Accumulator, DeformationKernel, DispatchOutcome, EigenFrame,
        ElasticityKernel, FixedPointLanes, FlowConfig, FlowKernel, FlowSolver, FrameInput,
        FrameView, Incidence, SmoothKernel, Stage, StrainKernel, StrainTensor, VertexState,
        pipeline::{init_stage, post_stage, scatter_edge, scatter_fan_in, scatter_triangle},
    },
    geometry::{Affine3, Mat3, Vec3},
    mesh::{AdjacencyKind, GraphLayout, MeshData, TopologyBuilder},
};
use rand::seq::SliceRandom;

fn single_triangle() -> MeshData {
    MeshData::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    )
}

fn tetrahedron() -> MeshData {
    MeshData::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
    )
}

/// 4x4 vertex grid in the z = 0 plane.
fn grid() -> MeshData {
    grid_with_spacing(1.0)
}

fn grid_with_spacing(spacing: f32) -> MeshData {
    let mut positions = Vec::new();
    for j in 0..4 {
        for i in 0..4 {
            positions.push(Vec3::new(i as f32 * spacing, j as f32 * spacing, 0.0));
        }
    }
    let mut triangles = Vec::new();
    for j in 0..3u32 {
        for i in 0..3u32 {
            let v = j * 4 + i;
            triangles.push([v, v + 1, v + 5]);
            triangles.push([v, v + 5, v + 4]);
        }
    }
    MeshData::new(positions, triangles)
}

/// Deterministic, non-uniform deformation.
fn wobble(rest: &[Vec3<f32>]) -> Vec<Vec3<f32>> {
    rest.iter()
        .enumerate()
        .map(|(i, p)| {
            let k = i as f32;
            Vec3::new(
                p.x * 1.3 + 0.05 * (k * 0.7).sin(),
                p.y * 0.8 + 0.04 * (k * 1.3).cos(),
                0.2 * (p.x * p.y * 0.5).sin(),
            )
        })
        .collect()
}

fn rotate_z(p: &Vec3<f32>) -> Vec3<f32> {
    Vec3::new(-p.y, p.x, p.z)
}

fn solver<K: FlowKernel>(mesh: &MeshData, kernel: K, config: FlowConfig) -> FlowSolver<K> {
    FlowSolver::from_mesh(mesh, kernel, config).unwrap()
}

/// Scatter Main driven by hand: `invocations` replays the edges or triangles
/// in whatever order the caller picked, once to calibrate and once to add.
fn fixed_point_main<K: FlowKernel>(
    accum: &mut [K::Accum],
    fan_in: usize,
    precision_bits: u32,
    invocations: impl Fn(&dyn Fn(usize, &K::Accum)),
) {
    let lanes_per_vertex = <K::Accum as Accumulator>::lane_count();
    let mut lanes = FixedPointLanes::new(accum.len(), lanes_per_vertex, fan_in, precision_bits);
    lanes.reset();
    accum.iter().for_each(|a| lanes.observe(a));
    invocations(&|_, c| lanes.observe(c));
    lanes.calibrate();
    for (v, a) in accum.iter().enumerate() {
        lanes.store(v, a);
    }
    invocations(&|v, c| lanes.add(v, c));
    for (v, a) in accum.iter_mut().enumerate() {
        *a = lanes.load(v);
    }
}

#[test]
fn single_triangle_outputs_are_finite() {
    let mesh = single_triangle();
    let rest = mesh.rest_positions.clone();
    let current = wobble(&rest);
    let input = FrameInput::new(&current, &rest, Affine3::identity());
    let config = FlowConfig::default();

    let mut elasticity = solver(&mesh, ElasticityKernel::new(&config), config.clone());
    let mut strain = solver(&mesh, StrainKernel::new(&config), config.clone());
    let mut deformation = solver(&mesh, DeformationKernel::new(&config), config.clone());
    let mut smooth = solver(&mesh, SmoothKernel::new(&config), config.clone());

    elasticity.dispatch(&input).unwrap();
    strain.dispatch(&input).unwrap();
    deformation.dispatch(&input).unwrap();
    smooth.dispatch(&input).unwrap();

    assert_eq!(elasticity.topology().edge_count(), 3);
    for v in 0..3u32 {
        assert!(elasticity.results().sample(v).is_finite());
        let s = strain.results().sample(v);
        assert!(s.compression.iter().chain(&s.tension).all(|x| x.is_finite()));
        assert!(deformation.results().sample(v).as_floats().iter().all(|x| x.is_finite()));
        assert!(smooth.results().sample(v).iter().all(|x| x.is_finite()));
        assert_eq!(deformation.results().sample(v).rows[3][1], 2.0);
    }
}

#[test]
fn rest_pose_has_no_stretch() {
    let mesh = tetrahedron();
    let rest = mesh.rest_positions.clone();
    let mut s = solver(&mesh, ElasticityKernel::default(), FlowConfig::default());
    let outcome = s.dispatch(&FrameInput::new(&rest, &rest, Affine3::identity())).unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed { frame: 1 });
    assert!(s.results().as_slice().iter().all(|&e| e == 0.0));
    assert_eq!(s.stage(), Stage::Idle);
}

#[test]
fn uniform_scale_doubles_every_edge() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let current: Vec<_> = rest.iter().map(|p| p.scale(2.0)).collect();
    let mut s = solver(&mesh, ElasticityKernel::default(), FlowConfig::default());
    s.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
    for &e in s.results().as_slice() {
        assert!((e - 1.0).abs() < 1e-5, "{e}");
    }

    let mut strain = solver(&mesh, StrainKernel::default(), FlowConfig::default());
    strain.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
    for t in strain.results().as_slice() {
        assert_eq!(t.compression, [0.0; 3]);
        assert!(t.tension.iter().any(|&x| x > 0.0));
    }
}

#[test]
fn compression_lands_in_first_row() {
    let mesh = single_triangle();
    let rest = mesh.rest_positions.clone();
    let current: Vec<_> = rest.iter().map(|p| p.scale(0.5)).collect();
    let mut s = solver(&mesh, StrainKernel::default(), FlowConfig::default());
    s.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
    for t in s.results().as_slice() {
        assert_eq!(t.tension, [0.0; 3]);
        assert!(t.compression.iter().any(|&x| x > 0.0));
    }
}

#[test]
fn adjust_transform_maps_rest_into_current_frame() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let adjust = Affine3::from_parts(
        Mat3::new([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]),
        Vec3::new(5.0, -2.0, 1.0),
    );
    let current: Vec<_> = rest.iter().map(|p| adjust.transform_point(p)).collect();

    let mut s = solver(&mesh, ElasticityKernel::default(), FlowConfig::default());
    s.dispatch(&FrameInput::new(&current, &rest, adjust)).unwrap();
    for &e in s.results().as_slice() {
        assert!(e.abs() < 1e-5, "{e}");
    }
}

#[test]
fn rigid_rotation_gives_unit_stretch() {
    for mesh in [single_triangle(), tetrahedron(), grid()] {
        let rest = mesh.rest_positions.clone();
        let current: Vec<_> = rest.iter().map(rotate_z).collect();
        let mut s = solver(&mesh, DeformationKernel::default(), FlowConfig::default());
        s.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
        for frame in s.results().as_slice() {
            for k in 0..3 {
                assert!((frame.eigenvalue(k) - 1.0).abs() < 1e-3, "{frame:?}");
                assert!((frame.eigenvector(k).norm() - 1.0).abs() < 1e-3);
            }
            assert!((frame.volume_ratio() - 1.0).abs() < 1e-3, "{frame:?}");
        }
    }
}

#[test]
fn in_plane_stretch_orders_eigenvalues() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let current: Vec<_> = rest.iter().map(|p| Vec3::new(p.x * 2.0, p.y, p.z)).collect();
    let mut s = solver(&mesh, DeformationKernel::default(), FlowConfig::default());
    s.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
    for frame in s.results().as_slice() {
        assert!((frame.eigenvalue(0) - 4.0).abs() < 1e-3, "{frame:?}");
        assert!((frame.eigenvalue(1) - 1.0).abs() < 1e-3, "{frame:?}");
        assert!((frame.eigenvalue(2) - 1.0).abs() < 1e-3, "{frame:?}");
        assert!(frame.eigenvector(0).x.abs() > 0.999);
        assert!((frame.volume_ratio() - 2.0).abs() < 1e-3);
    }
}

#[test]
fn isolated_vertex_gets_defined_values() {
    let mut mesh = single_triangle();
    mesh.rest_positions.push(Vec3::new(5.0, 5.0, 5.0));
    let rest = mesh.rest_positions.clone();
    let current = wobble(&rest);
    let input = FrameInput::new(&current, &rest, Affine3::identity());

    let mut e = solver(&mesh, ElasticityKernel::default(), FlowConfig::default());
    let mut t = solver(&mesh, StrainKernel::default(), FlowConfig::default());
    let mut d = solver(&mesh, DeformationKernel::default(), FlowConfig::default());
    let config = FlowConfig::default();
    let mut m = solver(&mesh, SmoothKernel::new(&config), config);
    e.dispatch(&input).unwrap();
    t.dispatch(&input).unwrap();
    d.dispatch(&input).unwrap();
    m.dispatch(&input).unwrap();

    assert_eq!(e.results().sample(3), 0.0);
    assert_eq!(t.results().sample(3), StrainTensor::default());
    let frame = d.results().sample(3);
    assert_eq!(frame.eigenvalue(0), 1.0);
    assert_eq!(frame.rows[3][1], 0.0);
    let p = current[3];
    assert_eq!(m.results().sample(3), [p.x, p.y, p.z, 1.0]);
}

#[test]
fn shuffled_scatter_matches_gather() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let current = wobble(&rest);
    let config = FlowConfig::default();
    let kernel = StrainKernel::new(&config);

    let mut gathered = solver(&mesh, kernel, config.clone());
    gathered.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();

    let topology = TopologyBuilder::new(mesh.vertex_count()).build_mesh(&mesh).unwrap();
    let layout = GraphLayout::from_topology(&topology);
    let frame = FrameView::new(&current, &rest, Affine3::identity());
    let n = mesh.vertex_count();

    let fan_in = scatter_fan_in(&topology, AdjacencyKind::Plain);
    let mut rng = rand::rng();
    let mut runs = Vec::new();
    for _ in 0..3 {
        let mut edges = topology.edges().to_vec();
        edges.shuffle(&mut rng);

        let mut accum = vec![[0.0_f32; 6]; n];
        init_stage(&kernel, &frame, &mut accum);
        fixed_point_main::<StrainKernel>(&mut accum, fan_in, config.fixed_point_bits, |emit| {
            for &e in &edges {
                scatter_edge(&kernel, &frame, e, emit);
            }
        });
        let mut out = vec![StrainTensor::default(); n];
        post_stage(&kernel, &frame, &accum, layout.degrees(), &mut out);
        runs.push(out);
    }

    // fixed-point sums are exact, so every order agrees bit for bit
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);

    for (g, s) in gathered.results().as_slice().iter().zip(&runs[0]) {
        for k in 0..3 {
            assert!((g.compression[k] - s.compression[k]).abs() < 1e-4);
            assert!((g.tension[k] - s.tension[k]).abs() < 1e-4);
        }
    }
}

#[test]
fn shuffled_triangle_scatter_matches_gather() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let current = wobble(&rest);
    let config = FlowConfig::default();
    let kernel = DeformationKernel::new(&config);

    let mut gathered = solver(&mesh, kernel, config.clone());
    gathered.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();

    let topology = TopologyBuilder::for_kind(mesh.vertex_count(), AdjacencyKind::Wedge)
        .build_mesh(&mesh)
        .unwrap();
    let layout = GraphLayout::from_topology(&topology);
    let frame = FrameView::new(&current, &rest, Affine3::identity());
    let n = mesh.vertex_count();

    let mut triangles = topology.triangles().to_vec();
    triangles.shuffle(&mut rand::rng());
    let mut accum = vec![[0.0_f32; 18]; n];
    init_stage(&kernel, &frame, &mut accum);
    let fan_in = scatter_fan_in(&topology, AdjacencyKind::Wedge);
    fixed_point_main::<DeformationKernel>(&mut accum, fan_in, config.fixed_point_bits, |emit| {
        for &t in &triangles {
            scatter_triangle(&kernel, &frame, t, emit);
        }
    });
    let mut out = vec![EigenFrame::identity(0); n];
    post_stage(&kernel, &frame, &accum, layout.degrees(), &mut out);

    for (g, s) in gathered.results().as_slice().iter().zip(&out) {
        for k in 0..3 {
            assert!((g.eigenvalue(k) - s.eigenvalue(k)).abs() < 1e-3);
        }
        assert!((g.volume_ratio() - s.volume_ratio()).abs() < 1e-3);
    }
}

#[test]
fn scatter_scheme_agrees_with_gather_scheme() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let current = wobble(&rest);
    let input = FrameInput::new(&current, &rest, Affine3::identity());

    let mut gather = solver(&mesh, ElasticityKernel::default(), FlowConfig::default());
    let mut scatter = solver(
        &mesh,
        ElasticityKernel::default(),
        FlowConfig::default().with_scheme(AccumulationScheme::Scatter),
    );
    gather.dispatch(&input).unwrap();
    scatter.dispatch(&input).unwrap();
    for (g, s) in gather.results().as_slice().iter().zip(scatter.results().as_slice()) {
        assert!((g - s).abs() < 1e-4, "{g} vs {s}");
    }
}

#[test]
fn scatter_matches_gather_on_millimetre_mesh() {
    let mesh = grid_with_spacing(1e-3);
    let rest = mesh.rest_positions.clone();
    let current: Vec<_> = rest.iter().map(|p| Vec3::new(p.x * 1.5, p.y, p.z)).collect();
    let input = FrameInput::new(&current, &rest, Affine3::identity());
    // triangle areas here are ~1e-6, so the length clamp has to sit below that
    let config = FlowConfig {
        edge_epsilon: 1e-9,
        ..Default::default()
    };
    let scatter_config = config.clone().with_scheme(AccumulationScheme::Scatter);

    let kernel = DeformationKernel::new(&config);
    let mut gather = solver(&mesh, kernel, config.clone());
    let mut scatter = solver(&mesh, kernel, scatter_config.clone());
    gather.dispatch(&input).unwrap();
    scatter.dispatch(&input).unwrap();
    for (g, s) in gather.results().as_slice().iter().zip(scatter.results().as_slice()) {
        assert!((s.eigenvalue(0) - 2.25).abs() < 1e-3, "{s:?}");
        assert!((s.volume_ratio() - 1.5).abs() < 1e-3, "{s:?}");
        for k in 0..3 {
            assert!((g.eigenvalue(k) - s.eigenvalue(k)).abs() < 1e-3, "{g:?} vs {s:?}");
        }
        assert!((g.volume_ratio() - s.volume_ratio()).abs() < 1e-3);
    }

    let mut gather = solver(&mesh, SmoothKernel::new(&config), config.clone());
    let mut scatter = solver(&mesh, SmoothKernel::new(&config), scatter_config);
    gather.dispatch(&input).unwrap();
    scatter.dispatch(&input).unwrap();
    for (g, s) in gather.results().as_slice().iter().zip(scatter.results().as_slice()) {
        for k in 0..3 {
            // far below the 1e-3 spacing
            assert!((g[k] - s[k]).abs() < 1e-8, "{g:?} vs {s:?}");
        }
    }
}

#[test]
fn scatter_handles_large_coordinates() {
    let spacing = 1e5;
    let mesh = grid_with_spacing(spacing);
    let rest = mesh.rest_positions.clone();
    let current: Vec<_> = rest.iter().map(|p| Vec3::new(p.x + 3e6, p.y * 2.0, p.z)).collect();
    let input = FrameInput::new(&current, &rest, Affine3::identity());
    let config = FlowConfig {
        scheme: AccumulationScheme::Scatter,
        fixed_point_bits: FixedPointLanes::MAX_PRECISION_BITS,
        ..Default::default()
    };

    let mut gather = solver(&mesh, SmoothKernel::new(&config), FlowConfig::default());
    let mut scatter = solver(&mesh, SmoothKernel::new(&config), config);
    gather.dispatch(&input).unwrap();
    scatter.dispatch(&input).unwrap();
    for (g, s) in gather.results().as_slice().iter().zip(scatter.results().as_slice()) {
        for k in 0..3 {
            assert!((g[k] - s[k]).abs() < spacing * 1e-4, "{g:?} vs {s:?}");
        }
    }
}

#[test]
fn gather_ignores_neighbour_order() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let current = wobble(&rest);
    let frame = FrameView::new(&current, &rest, Affine3::identity());
    let n = mesh.vertex_count();
    let mut rng = rand::rng();

    let strain = StrainKernel::default();
    let mut reference = solver(&mesh, strain, FlowConfig::default());
    reference.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
    let layout = reference.layout();
    let mut accum = vec![[0.0_f32; 6]; n];
    init_stage(&strain, &frame, &mut accum);
    for (v, a) in accum.iter_mut().enumerate() {
        let mut neighbours = layout.neighbors(v).to_vec();
        neighbours.shuffle(&mut rng);
        for to in neighbours {
            a.accumulate(&strain.contribute(v, Incidence::Edge { to }, &frame));
        }
    }
    let mut out = vec![StrainTensor::default(); n];
    post_stage(&strain, &frame, &accum, layout.degrees(), &mut out);
    for (g, s) in reference.results().as_slice().iter().zip(&out) {
        for k in 0..3 {
            assert!((g.compression[k] - s.compression[k]).abs() < 1e-5);
            assert!((g.tension[k] - s.tension[k]).abs() < 1e-5);
        }
    }

    let deformation = DeformationKernel::default();
    let mut reference = solver(&mesh, deformation, FlowConfig::default());
    reference.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
    let topology = reference.topology();
    let mut accum = vec![[0.0_f32; 18]; n];
    init_stage(&deformation, &frame, &mut accum);
    for (v, a) in accum.iter_mut().enumerate() {
        let mut wedges = topology.wedges(v).unwrap().to_vec();
        wedges.shuffle(&mut rng);
        for [b, c] in wedges {
            a.accumulate(&deformation.contribute(v, Incidence::Wedge { b, c }, &frame));
        }
    }
    let mut out = vec![EigenFrame::identity(0); n];
    post_stage(&deformation, &frame, &accum, reference.layout().degrees(), &mut out);
    for (g, s) in reference.results().as_slice().iter().zip(&out) {
        for k in 0..3 {
            assert!((g.eigenvalue(k) - s.eigenvalue(k)).abs() < 1e-4, "{g:?} vs {s:?}");
        }
        assert!((g.volume_ratio() - s.volume_ratio()).abs() < 1e-4);
    }
}

#[test]
fn missing_current_buffer_skips_frame() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let mut s = solver(&mesh, ElasticityKernel::default(), FlowConfig::default());

    let outcome = s.dispatch(&FrameInput::pending(&rest, Affine3::identity())).unwrap();
    assert_eq!(outcome, DispatchOutcome::Skipped);
    assert_eq!(s.results().frame(), 0);

    let current: Vec<_> = rest.iter().map(|p| p.scale(3.0)).collect();
    s.dispatch(&FrameInput::new(&current, &rest, Affine3::identity())).unwrap();
    let before = s.results().as_slice().to_vec();

    let outcome = s.dispatch(&FrameInput::pending(&rest, Affine3::identity())).unwrap();
    assert_eq!(outcome, DispatchOutcome::Skipped);
    assert_eq!(s.results().frame(), 1);
    assert_eq!(s.results().as_slice(), before.as_slice());
}

#[test]
fn mismatched_buffers_are_rejected() {
    let mesh = grid();
    let rest = mesh.rest_positions.clone();
    let short = &rest[..5];
    let mut s = solver(&mesh, ElasticityKernel::default(), FlowConfig::default());

    let err = s.dispatch(&FrameInput::new(short, &rest, Affine3::identity())).unwrap_err();
    assert!(matches!(
        err,
        MeshFlowError::BufferLength { expected: 16, actual: 5, .. }
    ));
    let err = s
        .dispatch(&FrameInput::new(&rest, &rest, Affine3::identity()).with_normals(short))
        .unwrap_err();
    assert!(matches!(err, MeshFlowError::BufferLength { buffer: "normals", .. }));
    assert_eq!(s.results().frame(), 0);
}

#[test]
fn mesh_attributes_are_checked_on_construction() {
    let mesh = grid().with_normals(vec![Vec3::new(0.0, 0.0, 1.0); 3]);
    let result = FlowSolver::from_mesh(&mesh, ElasticityKernel::default(), FlowConfig::default());
    assert!(matches!(
        result,
        Err(MeshFlowError::BufferLength { buffer: "normals", expected: 16, actual: 3 })
    ));
}

#[test]
fn wedge_kernel_needs_wedge_topology() {
    let mesh = grid();
    let plain = TopologyBuilder::new(mesh.vertex_count()).build_mesh(&mesh).unwrap();
    let result = FlowSolver::new(plain, DeformationKernel::default(), FlowConfig::default());
    assert!(matches!(result, Err(MeshFlowError::Config(_))));
}

#[test]
fn invalid_config_is_rejected() {
    let mesh = grid();
    for bits in [0, 23, FixedPointLanes::MAX_PRECISION_BITS + 1] {
        let config = FlowConfig {
            fixed_point_bits: bits,
            ..Default::default()
        };
        let result = FlowSolver::from_mesh(&mesh, ElasticityKernel::default(), config);
        assert!(matches!(result, Err(MeshFlowError::Config(_))), "{bits}");
    }
}

/// Square fan around a raised centre vertex.
fn pyramid() -> MeshData {
    MeshData::new(
        vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
        vec![[4, 0, 1], [4, 1, 2], [4, 2, 3], [4, 3, 0]],
    )
}

#[test]
fn smoothing_respects_vertex_states() {
    let mesh = pyramid();
    let rest = mesh.rest_positions.clone();
    let config = FlowConfig::default();

    let mut free = solver(&mesh, SmoothKernel::new(&config), config.clone());
    free.dispatch(&FrameInput::new(&rest, &rest, Affine3::identity())).unwrap();
    assert_eq!(free.results().sample(4), [0.0, 0.0, 0.5, 1.0]);

    let mut states = vec![VertexState::Float; 5];
    states[4] = VertexState::Fixed;
    let kernel = SmoothKernel::new(&config).with_states(states);
    let mut pinned = solver(&mesh, kernel, config.clone());
    pinned.dispatch(&FrameInput::new(&rest, &rest, Affine3::identity())).unwrap();
    assert_eq!(pinned.results().sample(4), [0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn tangential_smoothing_drops_normal_motion() {
    let mesh = pyramid();
    let rest = mesh.rest_positions.clone();
    let normals = vec![Vec3::new(0.0, 0.0, 1.0); 5];
    let config = FlowConfig::default();
    let kernel = SmoothKernel::new(&config).with_tangential(true);
    let mut s = solver(&mesh, kernel, config);
    s.dispatch(&FrameInput::new(&rest, &rest, Affine3::identity()).with_normals(&normals))
        .unwrap();
    assert_eq!(s.results().sample(4), [0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn smoothing_states_must_cover_mesh() {
    let mesh = pyramid();
    let config = FlowConfig::default();
    let kernel = SmoothKernel::new(&config).with_states(vec![VertexState::Fixed; 2]);
    let result = FlowSolver::from_mesh(&mesh, kernel, config);
    assert!(matches!(result, Err(MeshFlowError::BufferLength { .. })));
}

#[test]
fn result_bytes_match_output_layout() {
    let mesh = grid();
    let s = solver(&mesh, DeformationKernel::default(), FlowConfig::default());
    assert_eq!(s.results().len(), 16);
    assert_eq!(s.results().as_bytes().len(), 16 * 64);
}

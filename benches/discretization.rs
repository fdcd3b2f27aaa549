use cesdsol::discretization::composed_differentiation_matrix;
use cesdsol::{Axis, Grid};
use criterion::{criterion_group, criterion_main, Criterion};

fn uniform_grid_1d(n: usize) -> Grid {
    Grid::new(vec![Axis::uniform(0.0, 1.0, n, None, 0).unwrap()])
}

fn uniform_grid_2d(n: usize) -> Grid {
    Grid::new(vec![
        Axis::uniform(0.0, 1.0, n, None, 0).unwrap(),
        Axis::uniform(0.0, 1.0, n, None, 1).unwrap(),
    ])
}

fn criterion_benchmark(c: &mut Criterion) {
    let grid_1d = uniform_grid_1d(2000);
    c.bench_function("first_derivative_1d_stencil3_n2000", |b| {
        b.iter(|| composed_differentiation_matrix(&grid_1d, &[1], 3).unwrap())
    });
    c.bench_function("second_derivative_1d_stencil5_n2000", |b| {
        b.iter(|| composed_differentiation_matrix(&grid_1d, &[2], 5).unwrap())
    });

    let grid_2d = uniform_grid_2d(80);
    c.bench_function("laplacian_2d_stencil3_n80x80", |b| {
        b.iter(|| composed_differentiation_matrix(&grid_2d, &[2, 0], 3).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

use vessel_detector::Grid;

/// 3-D volume of zeros with a bright tube of `radius` running along axis 2
/// through the centre of the x/y plane.
pub fn line_volume(nx: usize, ny: usize, nz: usize, radius: f64) -> Grid<f32> {
    assert!(nx > 0 && ny > 0 && nz > 0, "volume extents must be positive");
    let (cx, cy) = ((nx / 2) as f64, (ny / 2) as f64);
    let mut data = vec![0.0f32; nx * ny * nz];
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= radius * radius {
                    data[(z * ny + y) * nx + x] = 1.0;
                }
            }
        }
    }
    Grid::from_vec(&[nx, ny, nz], &[1.0, 1.0, 1.0], data).expect("valid volume")
}

/// Volume with the same value everywhere.
pub fn uniform_volume(nx: usize, ny: usize, nz: usize, value: f32) -> Grid<f32> {
    Grid::filled(&[nx, ny, nz], &[1.0, 1.0, 1.0], value).expect("valid volume")
}

/// 2-D image with a horizontal line of half-width `radius` through the centre.
/// `dark == true` draws a dark line on a bright background.
pub fn line_image(w: usize, h: usize, radius: usize, dark: bool) -> Grid<f32> {
    let cy = h / 2;
    let (line, background) = if dark { (0.1, 0.9) } else { (0.9, 0.1) };
    let data = (0..h)
        .flat_map(|y| {
            let v = if y.abs_diff(cy) <= radius { line } else { background };
            std::iter::repeat(v).take(w)
        })
        .collect();
    Grid::from_vec(&[w, h], &[1.0, 1.0], data).expect("valid image")
}

/// Deterministic pseudo-random structure: a few tubes plus a smooth ripple.
pub fn textured_volume(nx: usize, ny: usize, nz: usize) -> Grid<f32> {
    let mut data = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let (fx, fy, fz) = (x as f32, y as f32, z as f32);
                let ripple = 0.2 * (0.7 * fx).sin() * (0.45 * fy).cos() + 0.1 * (0.3 * fz).sin();
                let tube_a = (-((fx - 5.0).powi(2) + (fy - 7.0).powi(2)) / 3.0).exp();
                let tube_b = (-((fy - 3.0).powi(2) + (fz - 4.0).powi(2)) / 2.0).exp();
                data.push(ripple + tube_a + 0.8 * tube_b);
            }
        }
    }
    Grid::from_vec(&[nx, ny, nz], &[1.0, 1.0, 1.5], data).expect("valid volume")
}

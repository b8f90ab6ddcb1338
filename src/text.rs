use three_d::*;


pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;
/// Empty columns between two glyphs
const GLYPH_SPACING: usize = 1;


/// Rows of a 5x7 glyph from top to bottom; bit 4 is the leftmost column
fn glyph(c: char) -> Option<[u8; GLYPH_HEIGHT]> {
    let rows = match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ' ' => [0x00; GLYPH_HEIGHT],
        _ => return None,
    };
    Some(rows)
}


/// Returns true if the block font can draw `c`
pub fn is_supported(c: char) -> bool {
    glyph(c).is_some()
}


/// Lit cells of `text` as (column, row) pairs, row 0 being the bottom row.
/// Unsupported characters take the space of a blank glyph.
pub fn lit_cells(text: &str) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    for (i, c) in text.chars().enumerate() {
        let rows = glyph(c).unwrap_or([0; GLYPH_HEIGHT]);
        let x0 = i*(GLYPH_WIDTH + GLYPH_SPACING);
        for (r, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) != 0 {
                    cells.push((x0 + col, GLYPH_HEIGHT - 1 - r));
                }
            }
        }
    }
    cells
}


/// Width of `text` in cells
pub fn text_columns(text: &str) -> usize {
    let n = text.chars().count();
    if n == 0 {
        return 0;
    }
    n*GLYPH_WIDTH + (n - 1)*GLYPH_SPACING
}


// unit cube corners of each face, counter-clockwise seen from outside
const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    ([1.0, 0.0, 0.0], [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]]),
    ([-1.0, 0.0, 0.0], [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]]),
    ([0.0, 1.0, 0.0], [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
    ([0.0, -1.0, 0.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]),
    ([0.0, 0.0, 1.0], [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
    ([0.0, 0.0, -1.0], [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]),
];


/// Builds a mesh of `text` where every lit font cell is extruded into a box
/// of `cell` x `cell` x `depth`.
/// The text is centered on x = 0 and z = 0 and sits on y = 0.
pub fn extrude_text(text: &str, cell: f32, depth: f32) -> CpuMesh {
    let cells = lit_cells(text);
    let x_offset = -0.5*text_columns(text) as f32*cell;

    let mut positions = Vec::<Vec3>::with_capacity(cells.len()*24);
    let mut normals = Vec::<Vec3>::with_capacity(cells.len()*24);
    let mut indices = Vec::<u32>::with_capacity(cells.len()*36);

    for (col, row) in cells {
        let origin = vec3(x_offset + col as f32*cell, row as f32*cell, -0.5*depth);
        for (normal, corners) in FACES.iter() {
            let base = positions.len() as u32;
            for corner in corners.iter() {
                positions.push(origin + vec3(corner[0]*cell, corner[1]*cell, corner[2]*depth));
                normals.push(vec3(normal[0], normal[1], normal[2]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    CpuMesh {
        positions: Positions::F32(positions),
        indices: Indices::U32(indices),
        normals: Some(normals),
        ..Default::default()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_glyph_fits_five_columns() {
        for c in ('A'..='Z').chain('0'..='9') {
            let rows = glyph(c).unwrap();
            assert!(rows.iter().all(|r| *r < 0x20), "glyph {}", c);
            assert!(rows.iter().any(|r| *r != 0), "glyph {} is blank", c);
        }
        assert!(is_supported('a'));
        assert!(!is_supported('#'));
    }

    #[test]
    fn lit_cells_of_letter_i() {
        let cells = lit_cells("I");
        // top and bottom bars of three cells plus a five-cell stem
        assert_eq!(cells.len(), 3 + 5 + 3);
        assert!(cells.contains(&(2, 0)));
        assert!(cells.contains(&(2, 6)));
        assert!(cells.iter().all(|(c, _)| (1..=3).contains(c)));
    }

    #[test]
    fn unsupported_characters_leave_a_gap() {
        assert_eq!(lit_cells("L#L").len(), 2*lit_cells("L").len());
        assert!(lit_cells("L#L").iter().any(|(c, _)| *c >= 2*(GLYPH_WIDTH + GLYPH_SPACING)));
        assert!(lit_cells("  ").is_empty());
    }

    #[test]
    fn text_columns_include_spacing() {
        assert_eq!(text_columns(""), 0);
        assert_eq!(text_columns("A"), 5);
        assert_eq!(text_columns("AB"), 11);
    }

    #[test]
    fn extruded_mesh_is_centered_boxes() {
        let mesh = extrude_text("T", 0.1, 0.3);
        let n = lit_cells("T").len();

        let positions = mesh.positions.to_f32();
        assert_eq!(positions.len(), 24*n);
        assert_eq!(mesh.normals.as_ref().unwrap().len(), 24*n);
        match &mesh.indices {
            Indices::U32(ind) => {
                assert_eq!(ind.len(), 36*n);
                assert!(ind.iter().all(|i| (*i as usize) < positions.len()));
            },
            _ => panic!("expected u32 indices"),
        }

        let min_x = positions.iter().map(|p| p.x).fold(f32::MAX, f32::min);
        let max_x = positions.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        assert!((min_x + 0.25).abs() < 1e-5);
        assert!((max_x - 0.25).abs() < 1e-5);

        let min_y = positions.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        let max_z = positions.iter().map(|p| p.z).fold(f32::MIN, f32::max);
        assert!(min_y.abs() < 1e-5);
        assert!((max_z - 0.15).abs() < 1e-5);
    }

    #[test]
    fn empty_text_gives_empty_mesh() {
        let mesh = extrude_text("", 1.0, 1.0);
        assert_eq!(mesh.positions.len(), 0);
    }
}

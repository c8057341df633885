//! Topología fija del esqueleto COCO de 17 puntos y su paleta.

use image::Rgb;

pub const NUM_KEYPOINTS: usize = 17;

const NOSE: Rgb<u8> = Rgb([0, 255, 0]);
const EYES: Rgb<u8> = Rgb([0, 0, 255]);
const EARS: Rgb<u8> = Rgb([255, 128, 0]);
const SHOULDERS: Rgb<u8> = Rgb([255, 0, 255]);
const ELBOWS: Rgb<u8> = Rgb([128, 0, 128]);
const WRISTS: Rgb<u8> = Rgb([255, 255, 0]);
const HIPS: Rgb<u8> = Rgb([0, 128, 255]);
const KNEES: Rgb<u8> = Rgb([128, 128, 0]);
const ANKLES: Rgb<u8> = Rgb([0, 128, 128]);

/// Color de cada punto clave, indexado por su posición en la salida del modelo.
pub const KEYPOINT_COLORS: [Rgb<u8>; NUM_KEYPOINTS] = [
    NOSE,      // 0 nariz
    EYES,      // 1 ojo derecho
    EYES,      // 2 ojo izquierdo
    EARS,      // 3 oreja derecha
    EARS,      // 4 oreja izquierda
    SHOULDERS, // 5 hombro derecho
    SHOULDERS, // 6 hombro izquierdo
    ELBOWS,    // 7 codo derecho
    ELBOWS,    // 8 codo izquierdo
    WRISTS,    // 9 muñeca derecha
    WRISTS,    // 10 muñeca izquierda
    HIPS,      // 11 cadera derecha
    HIPS,      // 12 cadera izquierda
    KNEES,     // 13 rodilla derecha
    KNEES,     // 14 rodilla izquierda
    ANKLES,    // 15 tobillo derecho
    ANKLES,    // 16 tobillo izquierdo
];

/// Conexiones del esqueleto (índice inicio, índice fin).
pub const SKELETON: [(usize, usize); 15] = [
    // cabeza
    (3, 1),
    (1, 0),
    (0, 2),
    (2, 4),
    // hombros
    (5, 6),
    // brazos
    (5, 7),
    (7, 9),
    (6, 8),
    (8, 10),
    // torso
    (5, 11),
    (6, 12),
    // piernas
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
];

pub const LINE_COLOR: Rgb<u8> = Rgb([255, 100, 100]);
pub const POINT_RADIUS: i32 = 5;
pub const LINE_THICKNESS: u32 = 2;

use crate::error::FilterError;

/// Post-decode (pre-encode) transform applied to Flate/LZW streams that
/// declare a `/Predictor` other than 1. Values 2-15 per spec.md §4.1;
/// `Optimum` (15) is accepted on the PNG path but not treated specially
/// (PNG encoders may freely choose a different tag per row; a decoder only
/// needs to honor the per-row tag byte, which `decode` already does).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: u8,
    pub colors: u8,
    pub bits_per_component: u8,
    pub columns: u32,
    /// LZW only: whether codes widen one code early (the PDF/TIFF
    /// convention) or exactly at `2^bits`.
    pub early_change: bool,
}

impl Default for PredictorParams {
    fn default() -> Self {
        PredictorParams {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

impl PredictorParams {
    fn bytes_per_pixel(&self) -> usize {
        ((self.colors as usize * self.bits_per_component as usize) + 7) / 8
    }

    fn row_bytes(&self) -> usize {
        (self.columns as usize * self.colors as usize * self.bits_per_component as usize + 7) / 8
    }

    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, FilterError> {
        match self.predictor {
            1 => Ok(data.to_vec()),
            2 => Ok(self.decode_tiff(data)),
            10..=15 => self.decode_png(data),
            other => Err(FilterError::Predictor {
                predictor: other,
                reason: "unrecognized predictor tag".to_string(),
            }),
        }
    }

    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, FilterError> {
        match self.predictor {
            1 => Ok(data.to_vec()),
            2 => Ok(self.encode_tiff(data)),
            // Always emit PNG "Up" (tag 2): cheap, decodable by every reader,
            // and avoids re-deriving which per-row tag the original producer
            // picked (`Optimum` search is explicitly not required, spec §4.1).
            10..=15 => Ok(self.encode_png_up(data)),
            other => Err(FilterError::Predictor {
                predictor: other,
                reason: "unrecognized predictor tag".to_string(),
            }),
        }
    }

    fn decode_tiff(&self, data: &[u8]) -> Vec<u8> {
        let bpp = self.bytes_per_pixel().max(1);
        let row_len = self.row_bytes();
        let mut out = data.to_vec();
        for row in out.chunks_mut(row_len) {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        out
    }

    fn encode_tiff(&self, data: &[u8]) -> Vec<u8> {
        let bpp = self.bytes_per_pixel().max(1);
        let row_len = self.row_bytes();
        let mut out = data.to_vec();
        for row in out.chunks_mut(row_len) {
            for i in (bpp..row.len()).rev() {
                row[i] = row[i].wrapping_sub(row[i - bpp]);
            }
        }
        out
    }

    fn decode_png(&self, data: &[u8]) -> Result<Vec<u8>, FilterError> {
        let bpp = self.bytes_per_pixel().max(1);
        let row_len = self.row_bytes();
        let stride = row_len + 1;
        if stride == 0 || data.len() % stride != 0 {
            return Err(FilterError::Predictor {
                predictor: self.predictor,
                reason: format!(
                    "data length {} is not a multiple of row stride {}",
                    data.len(),
                    stride
                ),
            });
        }

        let mut out = Vec::with_capacity(data.len() / stride * row_len);
        let mut prev_row = vec![0u8; row_len];

        for chunk in data.chunks(stride) {
            let tag = chunk[0];
            let mut row = chunk[1..].to_vec();
            for i in 0..row.len() {
                let a = if i >= bpp { row[i - bpp] } else { 0 };
                let b = prev_row[i];
                let c = if i >= bpp { prev_row[i - bpp] } else { 0 };
                let predicted = match tag {
                    0 => 0,
                    1 => a,
                    2 => b,
                    3 => ((a as u16 + b as u16) / 2) as u8,
                    4 => paeth(a, b, c),
                    other => {
                        return Err(FilterError::Predictor {
                            predictor: self.predictor,
                            reason: format!("unsupported PNG row tag {other}"),
                        })
                    }
                };
                row[i] = row[i].wrapping_add(predicted);
            }
            out.extend_from_slice(&row);
            prev_row = row;
        }

        Ok(out)
    }

    fn encode_png_up(&self, data: &[u8]) -> Vec<u8> {
        let row_len = self.row_bytes().max(1);
        let mut out = Vec::with_capacity(data.len() + data.len() / row_len.max(1) + 1);
        let mut prev_row = vec![0u8; row_len];

        for chunk in data.chunks(row_len) {
            out.push(2);
            for (i, &byte) in chunk.iter().enumerate() {
                let b = prev_row.get(i).copied().unwrap_or(0);
                out.push(byte.wrapping_sub(b));
            }
            prev_row = chunk.to_vec();
            prev_row.resize(row_len, 0);
        }

        out
    }
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_sub_predictor_round_trip() {
        // Two rows of 3 bytes, tag 1 = Sub, per spec.md scenario 5.
        let tagged = [1u8, b'a', b'b', b'c', 1u8, b'd', b'e', b'f'];
        let params = PredictorParams {
            predictor: 11,
            colors: 1,
            bits_per_component: 8,
            columns: 3,
            early_change: true,
        };
        let decoded = params.decode(&tagged).unwrap();
        let expected: Vec<u8> = vec![
            b'a',
            b'a'.wrapping_add(b'b'),
            b'a'.wrapping_add(b'b').wrapping_add(b'c'),
            b'd',
            b'd'.wrapping_add(b'e'),
            b'd'.wrapping_add(b'e').wrapping_add(b'f'),
        ];
        assert_eq!(decoded, expected);
    }

    #[test]
    fn tiff_predictor_round_trip() {
        let params = PredictorParams {
            predictor: 2,
            colors: 1,
            bits_per_component: 8,
            columns: 4,
            early_change: true,
        };
        let original = vec![10u8, 20, 5, 200, 1, 2, 3, 4];
        let encoded = params.encode(&original);
        let decoded = params.decode(&encoded).unwrap();
        assert_eq!(decoded, original);
    }
}

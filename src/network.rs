use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Array3, Array4};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::encoder::{BOARD_SIDE, PLANES};

/// Policy output slots: one logit per (from * 64 + to) square pair.
pub const POLICY_SIZE: usize = 4096;

const MAGIC: &[u8; 8] = b"HYCNET01";
const VERSION: u32 = 1;

/// Small convolutional policy/value network.
///
/// Topology: conv 12->c1 (3x3, pad 1, relu), conv c1->c2 (3x3, pad 1, relu),
/// flatten, linear policy head to 4096 logits, linear value head to one
/// tanh-squashed scalar in [-1, 1]. The production checkpoint uses c1=64,
/// c2=128; the filter counts are carried in the checkpoint header so tests
/// can work with small instances.
#[derive(Debug, Clone)]
pub struct ChessNet {
    pub conv1_w: Array4<f32>, // (c1, 12, 3, 3)
    pub conv1_b: Array1<f32>, // (c1)
    pub conv2_w: Array4<f32>, // (c2, c1, 3, 3)
    pub conv2_b: Array1<f32>, // (c2)
    pub policy_w: Array2<f32>, // (4096, c2 * 64)
    pub policy_b: Array1<f32>, // (4096)
    pub value_w: Array2<f32>, // (1, c2 * 64)
    pub value_b: Array1<f32>, // (1)
}

impl ChessNet {
    pub fn new() -> Self {
        Self::with_filters(64, 128)
    }

    /// Zero-initialized network with the given conv filter counts.
    pub fn with_filters(c1: usize, c2: usize) -> Self {
        let flat = c2 * BOARD_SIDE * BOARD_SIDE;
        Self {
            conv1_w: Array4::zeros((c1, PLANES, 3, 3)),
            conv1_b: Array1::zeros(c1),
            conv2_w: Array4::zeros((c2, c1, 3, 3)),
            conv2_b: Array1::zeros(c2),
            policy_w: Array2::zeros((POLICY_SIZE, flat)),
            policy_b: Array1::zeros(POLICY_SIZE),
            value_w: Array2::zeros((1, flat)),
            value_b: Array1::zeros(1),
        }
    }

    pub fn conv_filters(&self) -> (usize, usize) {
        (self.conv1_w.dim().0, self.conv2_w.dim().0)
    }

    /// Forward pass: policy logits (4096) and a scalar value in [-1, 1].
    pub fn forward(&self, planes: &Array3<f32>) -> (Array1<f32>, f32) {
        let h1 = conv2d_relu(planes, &self.conv1_w, &self.conv1_b);
        let h2 = conv2d_relu(&h1, &self.conv2_w, &self.conv2_b);
        let flat = Array1::from_iter(h2.iter().copied());
        let policy = self.policy_w.dot(&flat) + &self.policy_b;
        let value = (self.value_w.dot(&flat)[0] + self.value_b[0]).tanh();
        (policy, value)
    }

    /// Load a checkpoint. Format, all little-endian:
    /// magic "HYCNET01", u32 version, u32 input planes, u32 conv1 filters,
    /// u32 conv2 filters, u32 policy size, then raw f32 blocks in layer
    /// order: conv1 w/b, conv2 w/b, policy w/b, value w/b.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(&path)
            .with_context(|| format!("open checkpoint: {}", path.as_ref().display()))?;
        let mut r = BufReader::new(f);

        let mut magic = [0u8; 8];
        r.read_exact(&mut magic).context("read magic")?;
        if &magic != MAGIC {
            bail!("bad checkpoint magic");
        }
        let version = read_u32(&mut r).context("read version")?;
        if version != VERSION {
            bail!("unsupported checkpoint version {version}");
        }
        let planes = read_u32(&mut r).context("read input planes")? as usize;
        if planes != PLANES {
            bail!("checkpoint expects {planes} input planes, encoder produces {PLANES}");
        }
        let c1 = read_u32(&mut r).context("read conv1 filters")? as usize;
        let c2 = read_u32(&mut r).context("read conv2 filters")? as usize;
        let policy = read_u32(&mut r).context("read policy size")? as usize;
        if policy != POLICY_SIZE {
            bail!("checkpoint policy size {policy} != {POLICY_SIZE}");
        }
        let flat = c2 * BOARD_SIDE * BOARD_SIDE;

        let conv1_w = Array4::from_shape_vec(
            (c1, PLANES, 3, 3),
            read_f32_block(&mut r, c1 * PLANES * 9).context("read conv1 weights")?,
        )?;
        let conv1_b = Array1::from_vec(read_f32_block(&mut r, c1).context("read conv1 bias")?);
        let conv2_w = Array4::from_shape_vec(
            (c2, c1, 3, 3),
            read_f32_block(&mut r, c2 * c1 * 9).context("read conv2 weights")?,
        )?;
        let conv2_b = Array1::from_vec(read_f32_block(&mut r, c2).context("read conv2 bias")?);
        let policy_w = Array2::from_shape_vec(
            (POLICY_SIZE, flat),
            read_f32_block(&mut r, POLICY_SIZE * flat).context("read policy weights")?,
        )?;
        let policy_b =
            Array1::from_vec(read_f32_block(&mut r, POLICY_SIZE).context("read policy bias")?);
        let value_w = Array2::from_shape_vec(
            (1, flat),
            read_f32_block(&mut r, flat).context("read value weights")?,
        )?;
        let value_b = Array1::from_vec(read_f32_block(&mut r, 1).context("read value bias")?);

        Ok(Self {
            conv1_w,
            conv1_b,
            conv2_w,
            conv2_b,
            policy_w,
            policy_b,
            value_w,
            value_b,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let f = File::create(&path)
            .with_context(|| format!("create checkpoint: {}", path.as_ref().display()))?;
        let mut w = BufWriter::new(f);
        let (c1, c2) = self.conv_filters();

        w.write_all(MAGIC).context("write magic")?;
        w.write_all(&VERSION.to_le_bytes()).context("write version")?;
        w.write_all(&(PLANES as u32).to_le_bytes()).context("write input planes")?;
        w.write_all(&(c1 as u32).to_le_bytes()).context("write conv1 filters")?;
        w.write_all(&(c2 as u32).to_le_bytes()).context("write conv2 filters")?;
        w.write_all(&(POLICY_SIZE as u32).to_le_bytes()).context("write policy size")?;

        for block in [
            self.conv1_w.as_slice().context("conv1 weights not contiguous")?,
            self.conv1_b.as_slice().context("conv1 bias not contiguous")?,
            self.conv2_w.as_slice().context("conv2 weights not contiguous")?,
            self.conv2_b.as_slice().context("conv2 bias not contiguous")?,
            self.policy_w.as_slice().context("policy weights not contiguous")?,
            self.policy_b.as_slice().context("policy bias not contiguous")?,
            self.value_w.as_slice().context("value weights not contiguous")?,
            self.value_b.as_slice().context("value bias not contiguous")?,
        ] {
            write_f32_block(&mut w, block).context("write weight block")?;
        }
        w.flush().context("flush checkpoint")?;
        Ok(())
    }
}

impl Default for ChessNet {
    fn default() -> Self {
        Self::new()
    }
}

/// 3x3 convolution with padding 1 followed by ReLU, plain loops over ndarray.
fn conv2d_relu(input: &Array3<f32>, weight: &Array4<f32>, bias: &Array1<f32>) -> Array3<f32> {
    let (out_c, in_c, kh, kw) = weight.dim();
    let (ic, h, w) = input.dim();
    debug_assert_eq!(in_c, ic);
    let mut out = Array3::<f32>::zeros((out_c, h, w));
    for o in 0..out_c {
        for y in 0..h {
            for x in 0..w {
                let mut acc = bias[o];
                for c in 0..in_c {
                    for ky in 0..kh {
                        let iy = y as isize + ky as isize - 1;
                        if iy < 0 || iy >= h as isize {
                            continue;
                        }
                        for kx in 0..kw {
                            let ix = x as isize + kx as isize - 1;
                            if ix < 0 || ix >= w as isize {
                                continue;
                            }
                            acc += weight[[o, c, ky, kx]] * input[[c, iy as usize, ix as usize]];
                        }
                    }
                }
                out[[o, y, x]] = acc.max(0.0);
            }
        }
    }
    out
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_f32_block(r: &mut impl Read, n: usize) -> Result<Vec<f32>> {
    let mut bytes = vec![0u8; n * 4];
    r.read_exact(&mut bytes)?;
    let mut out = Vec::with_capacity(n);
    for chunk in bytes.chunks_exact(4) {
        out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(out)
}

fn write_f32_block(w: &mut impl Write, block: &[f32]) -> Result<()> {
    for v in block {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::encoder;

    #[test]
    fn forward_output_shapes() {
        let net = ChessNet::with_filters(2, 3);
        let planes = encoder::encode(&Position::startpos());
        let (policy, value) = net.forward(&planes);
        assert_eq!(policy.len(), POLICY_SIZE);
        assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn zeroed_net_policy_equals_bias() {
        let mut net = ChessNet::with_filters(1, 1);
        net.policy_b[796] = 2.5;
        let planes = encoder::encode(&Position::startpos());
        let (policy, value) = net.forward(&planes);
        assert_eq!(policy[796], 2.5);
        assert_eq!(policy[0], 0.0);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn conv_identity_kernel_passes_input_through() {
        // Single input channel, single filter with a centered 1.0 tap
        let mut weight = Array4::<f32>::zeros((1, 1, 3, 3));
        weight[[0, 0, 1, 1]] = 1.0;
        let bias = Array1::<f32>::zeros(1);
        let mut input = Array3::<f32>::zeros((1, 8, 8));
        input[[0, 3, 5]] = 1.0;
        input[[0, 0, 0]] = -1.0; // relu clips this one
        let out = conv2d_relu(&input, &weight, &bias);
        assert_eq!(out[[0, 3, 5]], 1.0);
        assert_eq!(out[[0, 0, 0]], 0.0);
    }
}

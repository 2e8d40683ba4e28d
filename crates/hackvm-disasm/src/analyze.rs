use std::collections::BTreeMap;

use serde::Serialize;

use hackvm_gen::decoder::decode_all;
use hackvm_gen::disasm::fmt_decoded;
use hackvm_gen::opcode::{Category, Format, Opcode};

use crate::model::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Jump,
    CondBranch,
    Call,
    /// Register-indirect; target unknown statically.
    Indirect,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Edge {
    pub from: u16,
    pub to: Option<u16>,
    pub kind: EdgeKind,
    /// Target lies after the branch, i.e. it needed a patch site.
    pub forward: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insn {
    pub pc: u16,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: String,
    pub len: usize,
    pub insns: Vec<Insn>,
    pub edges: Vec<Edge>,
    /// Branch target -> synthesized label, with the number of incoming edges.
    pub labels: BTreeMap<u16, (String, usize)>,
    /// Offset of the first byte that did not decode, if any.
    pub bad_at: Option<usize>,
}

fn edge_kind(op: Opcode) -> Option<EdgeKind> {
    if op.category() != Category::Branch {
        return None;
    }
    Some(match (op, op.format()) {
        (Opcode::Jmp, _) => EdgeKind::Jump,
        (Opcode::Call, _) => EdgeKind::Call,
        (_, Format::Unary) => EdgeKind::Indirect,
        _ => EdgeKind::CondBranch,
    })
}

pub fn analyze(img: &Image) -> Report {
    let (decoded, bad_at) = decode_all(&img.bytes);
    let mut insns = Vec::with_capacity(decoded.len());
    let mut edges = Vec::new();
    let mut labels: BTreeMap<u16, (String, usize)> = BTreeMap::new();
    for (pc, d) in &decoded {
        let pc = *pc as u16;
        insns.push(Insn { pc, text: fmt_decoded(d) });
        let Some(kind) = edge_kind(d.op) else { continue };
        let to = d.branch_target();
        edges.push(Edge { from: pc, to, kind, forward: to.is_some_and(|t| t > pc) });
        if let Some(t) = to {
            labels
                .entry(t)
                .or_insert_with(|| (format!("loc_{t:04x}"), 0))
                .1 += 1;
        }
    }
    Report { name: img.name.clone(), len: img.bytes.len(), insns, edges, labels, bad_at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hackvm_gen::programs;

    #[test]
    fn gradient_has_one_backward_edge() {
        let p = programs::gradient().unwrap();
        let r = analyze(&Image { name: p.name.into(), bytes: p.bytes });
        assert_eq!(r.edges.len(), 1);
        let e = r.edges[0];
        assert_eq!((e.from, e.to, e.kind, e.forward), (0x1f, Some(0x0c), EdgeKind::CondBranch, false));
        assert_eq!(r.labels.get(&0x0c), Some(&("loc_000c".to_string(), 1)));
        assert_eq!(r.bad_at, None);
    }

    #[test]
    fn moving_pixel_fan_in_label() {
        let p = programs::moving_pixel().unwrap();
        let r = analyze(&Image { name: p.name.into(), bytes: p.bytes });
        assert_eq!(r.labels.get(&0x50).map(|(_, n)| *n), Some(5));
        assert_eq!(r.edges.iter().filter(|e| e.forward).count(), 8);
    }
}

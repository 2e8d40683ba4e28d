//! Forward-reference bookkeeping.
//!
//! A forward branch writes two placeholder bytes and records a [`PatchSite`].
//! Labels are resolved to absolute program offsets with
//! [`Patcher::resolve_label`]; [`Patcher::apply`] then writes every site in one
//! final pass. Several sites may share a label.

use serde::Serialize;
use tracing::debug;

/// A branch target whose offset may not be known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Label(u32);

impl Label {
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Byte offset of a two-byte placeholder awaiting `label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatchSite {
    pub at: usize,
    pub label: Label,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("label L{0} was not issued by this emitter")]
    UnknownLabel(u32),
    #[error("label L{label} already resolved to {prev:#06x}")]
    LabelAlreadyResolved { label: u32, prev: usize },
    #[error("label L{label} referenced at {at:#06x} was never resolved")]
    UnresolvedLabel { label: u32, at: usize },
    #[error("label L{label} resolves to {target:#06x}, past program end {len:#06x}")]
    TargetPastEnd { label: u32, target: usize, len: usize },
    #[error("branch at {at:#06x} targets {target:#x}, outside the 16-bit address space")]
    BranchOutOfRange { at: usize, target: usize },
}

/// Little-endian target bytes for a branch operand at `at`.
pub(crate) fn branch_operand(at: usize, target: usize) -> Result<[u8; 2], AsmError> {
    u16::try_from(target)
        .map(u16::to_le_bytes)
        .map_err(|_| AsmError::BranchOutOfRange { at, target })
}

#[derive(Debug, Clone, Default)]
pub struct Patcher {
    labels: Vec<Option<usize>>,
    sites: Vec<PatchSite>,
}

impl Patcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_label(&mut self) -> Label {
        let id = self.labels.len() as u32;
        self.labels.push(None);
        Label(id)
    }

    fn slot(&self, label: Label) -> Result<Option<usize>, AsmError> {
        self.labels
            .get(label.0 as usize)
            .copied()
            .ok_or(AsmError::UnknownLabel(label.0))
    }

    /// Records that the two bytes at `at` must receive `label`'s offset.
    pub fn record(&mut self, at: usize, label: Label) -> Result<(), AsmError> {
        self.slot(label)?;
        self.sites.push(PatchSite { at, label });
        Ok(())
    }

    pub fn resolve_label(&mut self, label: Label, offset: usize) -> Result<(), AsmError> {
        if let Some(prev) = self.slot(label)? {
            return Err(AsmError::LabelAlreadyResolved { label: label.0, prev });
        }
        self.labels[label.0 as usize] = Some(offset);
        debug!(label = label.0, offset, "label resolved");
        Ok(())
    }

    pub fn target(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).copied().flatten()
    }

    pub fn sites(&self) -> &[PatchSite] {
        &self.sites
    }

    /// Writes every recorded site into `bytes`. Fails on the first site whose
    /// label is unresolved, points at or past the end of `bytes`, or does not
    /// fit the 16-bit operand.
    pub fn apply(&self, bytes: &mut [u8]) -> Result<usize, AsmError> {
        for site in &self.sites {
            let target = self.target(site.label).ok_or(AsmError::UnresolvedLabel {
                label: site.label.0,
                at: site.at,
            })?;
            if target >= bytes.len() {
                return Err(AsmError::TargetPastEnd {
                    label: site.label.0,
                    target,
                    len: bytes.len(),
                });
            }
            let operand = branch_operand(site.at, target)?;
            bytes[site.at..site.at + 2].copy_from_slice(&operand);
            debug!(at = site.at, label = site.label.0, target, "patched");
        }
        Ok(self.sites.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_in_sites_share_target() {
        let mut p = Patcher::new();
        let l = p.new_label();
        let mut bytes = vec![0u8; 12];
        p.record(1, l).unwrap();
        p.record(4, l).unwrap();
        p.record(7, l).unwrap();
        p.resolve_label(l, 10).unwrap();
        assert_eq!(p.apply(&mut bytes).unwrap(), 3);
        for at in [1, 4, 7] {
            assert_eq!(u16::from_le_bytes([bytes[at], bytes[at + 1]]), 10);
        }
    }

    #[test]
    fn double_resolve_is_rejected() {
        let mut p = Patcher::new();
        let l = p.new_label();
        p.resolve_label(l, 3).unwrap();
        assert_eq!(
            p.resolve_label(l, 5),
            Err(AsmError::LabelAlreadyResolved { label: 0, prev: 3 })
        );
        assert_eq!(p.target(l), Some(3));
    }

    #[test]
    fn unresolved_site_fails_apply() {
        let mut p = Patcher::new();
        let l = p.new_label();
        p.record(1, l).unwrap();
        let mut bytes = vec![0u8; 4];
        assert_eq!(p.apply(&mut bytes), Err(AsmError::UnresolvedLabel { label: 0, at: 1 }));
    }

    #[test]
    fn foreign_label_is_rejected() {
        let mut other = Patcher::new();
        other.new_label();
        let foreign = other.new_label();
        let mut p = Patcher::new();
        assert_eq!(p.record(0, foreign), Err(AsmError::UnknownLabel(1)));
        assert_eq!(p.resolve_label(foreign, 0), Err(AsmError::UnknownLabel(1)));
    }

    #[test]
    fn target_at_end_is_rejected() {
        let mut p = Patcher::new();
        let l = p.new_label();
        p.record(1, l).unwrap();
        p.resolve_label(l, 3).unwrap();
        let mut bytes = vec![0u8; 3];
        assert!(matches!(p.apply(&mut bytes), Err(AsmError::TargetPastEnd { .. })));
    }

    #[test]
    fn target_beyond_16_bits_is_rejected() {
        let mut p = Patcher::new();
        let l = p.new_label();
        p.record(1, l).unwrap();
        p.resolve_label(l, 0x1_0003).unwrap();
        let mut bytes = vec![0u8; 0x1_0004];
        assert_eq!(
            p.apply(&mut bytes),
            Err(AsmError::BranchOutOfRange { at: 1, target: 0x1_0003 })
        );
        assert_eq!(&bytes[1..3], &[0, 0]);
    }
}

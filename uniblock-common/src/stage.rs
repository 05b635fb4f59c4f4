use bitflags::bitflags;

bitflags! {
    /// The shader stages that reference a uniform block.
    pub struct BindingStage: u8 {
        /// Not referenced by any stage.
        const NONE = 0b00000000;
        /// Referenced by the vertex shader.
        const VERTEX = 0b00000001;
        /// Referenced by the fragment shader.
        const FRAGMENT = 0b00000010;
    }
}

impl Default for BindingStage {
    fn default() -> Self {
        BindingStage::NONE
    }
}

impl BindingStage {
    /// Build a stage mask from the per-stage "referenced by" flags a driver reports.
    pub fn from_referenced(vertex: bool, fragment: bool) -> Self {
        let mut mask = BindingStage::NONE;
        mask.set(BindingStage::VERTEX, vertex);
        mask.set(BindingStage::FRAGMENT, fragment);
        mask
    }
}

#[cfg(test)]
mod test {
    use crate::BindingStage;

    #[test]
    fn stage_mask_from_flags() {
        assert_eq!(BindingStage::from_referenced(false, false), BindingStage::NONE);
        assert_eq!(
            BindingStage::from_referenced(true, true),
            BindingStage::VERTEX | BindingStage::FRAGMENT
        );
        assert!(BindingStage::from_referenced(false, true).contains(BindingStage::FRAGMENT));
    }
}

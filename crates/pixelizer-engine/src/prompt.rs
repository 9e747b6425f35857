use sha2::{Digest, Sha256};

/// Fixed pixel-art instruction; only the reference count varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    reference_count: usize,
}

impl PromptBuilder {
    pub fn new(reference_count: usize) -> Self {
        Self { reference_count }
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    pub fn build(&self) -> String {
        let references = match self.reference_count {
            1 => "1 reference image".to_string(),
            count => format!("{count} reference images"),
        };
        format!(
            "Convert the person from the target image into the visual style of the {references}.\n\n\
             Style description (from the {references}):\n\
             Pixel art format, the person is exactly 32 large pixels wide × 64 large pixels high\n\
             Blocky, unshaded pixels, no gradients or textures\n\
             Neutral pose: frontal view, shoulder-width stance, arms hanging straight down, hands in front of body\n\
             Light grey background (#d3d3d3), solid color\n\
             Facial features stylized: eyes as short lines or dots, simplified mouth, blocky nose\n\
             Clothing and hair simplified to flat colored shapes\n\
             No outlines, no detail shading, everything flat and geometric\n\n\
             Apply this style to the person in the target image:\n\
             Retain their clothing type, hair color/style, facial structure, facial expression, mouth expression, eye color, and accessories\n\
             Convert everything into the described pixel style\n\
             Adjust posture and background to match the reference images exactly"
        )
    }
}

/// Hex SHA-256 of a prompt, recorded in receipts instead of the text.
pub fn prompt_digest(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{prompt_digest, PromptBuilder};

    #[test]
    fn prompt_mentions_reference_count() {
        let prompt = PromptBuilder::new(7).build();
        assert!(prompt.starts_with(
            "Convert the person from the target image into the visual style of the 7 reference images."
        ));
        assert!(prompt.contains("Style description (from the 7 reference images):"));
        assert!(PromptBuilder::new(1).build().contains("the 1 reference image."));
    }

    #[test]
    fn prompt_fixes_dimensions_pose_and_background() {
        let prompt = PromptBuilder::new(4).build();
        assert!(prompt.contains("exactly 32 large pixels wide × 64 large pixels high"));
        assert!(prompt.contains("Neutral pose: frontal view"));
        assert!(prompt.contains("Light grey background (#d3d3d3)"));
        assert!(prompt.contains("eye color, and accessories"));
        assert_eq!(prompt.lines().count(), 15);
    }

    #[test]
    fn only_reference_count_changes_prompt() {
        let four = PromptBuilder::new(4).build();
        let seven = PromptBuilder::new(7).build();
        assert_ne!(four, seven);
        assert_eq!(four.replace("4 reference", "7 reference"), seven);
    }

    #[test]
    fn digest_is_stable_hex() {
        let digest = prompt_digest("pixel");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, prompt_digest("pixel"));
        assert_ne!(digest, prompt_digest("pixels"));
    }
}

use super::validation::{DesignJob, DesignMode};
use super::{RoomType, Style};

/// Renders the instruction sent alongside the room photo. Pure: the same job
/// always yields the same bytes.
pub fn build_design_prompt(job: &DesignJob) -> String {
    match &job.mode {
        DesignMode::Generate {
            style,
            room_type,
            description,
        } => generation_prompt(*style, *room_type, description.as_deref()),
        DesignMode::Edit { edit_prompt, .. } => edit_prompt_text(edit_prompt),
    }
}

fn generation_prompt(style: Style, room_type: RoomType, description: Option<&str>) -> String {
    let description = description
        .map(|text| text.trim().trim_end_matches('.').trim_end())
        .filter(|text| !text.is_empty())
        .map(|text| format!("{text}. "))
        .unwrap_or_default();
    format!(
        "Transform this empty room into a beautifully designed {style} style {room_type}. \
         {description}Add appropriate furniture, decorations, lighting, and color scheme \
         matching the {style} aesthetic. Make it look professional and inviting."
    )
}

fn edit_prompt_text(edit_prompt: &str) -> String {
    let instruction = edit_prompt.trim().trim_end_matches('.').trim_end();
    format!(
        "Modify this room design: {instruction}. Keep the overall room structure but apply \
         the requested changes to colors, furniture sizes, or design elements. Make it look \
         professional and realistic."
    )
}

/// Joins the editor's colour field and free-form instructions into one
/// `editPrompt`. Returns `None` when both are blank.
pub fn compose_edit_instructions(color_change: Option<&str>, instructions: Option<&str>) -> Option<String> {
    let color = color_change.map(str::trim).filter(|text| !text.is_empty());
    let instructions = instructions.map(str::trim).filter(|text| !text.is_empty());
    let mut prompt = String::new();
    if let Some(color) = color {
        prompt.push_str(&format!("Change the colors to {color}. "));
    }
    if let Some(instructions) = instructions {
        prompt.push_str(instructions);
    }
    let prompt = prompt.trim_end().to_string();
    (!prompt.is_empty()).then_some(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_job(description: Option<&str>) -> DesignJob {
        DesignJob {
            image_data: "data:image/png;base64,AAAA".to_string(),
            mode: DesignMode::Generate {
                style: Style::Modern,
                room_type: RoomType::LivingRoom,
                description: description.map(str::to_string),
            },
        }
    }

    #[test]
    fn generation_prompt_matches_golden_text() {
        assert_eq!(
            build_design_prompt(&generate_job(Some("Lots of natural light"))),
            "Transform this empty room into a beautifully designed Modern style Living Room. \
             Lots of natural light. Add appropriate furniture, decorations, lighting, and color \
             scheme matching the Modern aesthetic. Make it look professional and inviting."
        );
    }

    #[test]
    fn generation_prompt_without_description_skips_the_sentence() {
        assert_eq!(
            build_design_prompt(&generate_job(None)),
            "Transform this empty room into a beautifully designed Modern style Living Room. \
             Add appropriate furniture, decorations, lighting, and color scheme matching the \
             Modern aesthetic. Make it look professional and inviting."
        );
        assert_eq!(
            build_design_prompt(&generate_job(Some("Cozy."))),
            build_design_prompt(&generate_job(Some("Cozy")))
        );
    }

    #[test]
    fn edit_prompt_matches_golden_text() {
        let job = DesignJob {
            image_data: "data:image/png;base64,AAAA".to_string(),
            mode: DesignMode::Edit {
                edit_prompt: "make the sofa green".to_string(),
                style: None,
                room_type: None,
            },
        };
        assert_eq!(
            build_design_prompt(&job),
            "Modify this room design: make the sofa green. Keep the overall room structure but \
             apply the requested changes to colors, furniture sizes, or design elements. Make it \
             look professional and realistic."
        );
    }

    #[test]
    fn prompts_are_deterministic() {
        let job = generate_job(Some("warm wood"));
        assert_eq!(build_design_prompt(&job), build_design_prompt(&job.clone()));
    }

    #[test]
    fn edit_instructions_combine_color_and_free_text() {
        assert_eq!(
            compose_edit_instructions(Some("sage green"), Some("Swap the rug for jute")),
            Some("Change the colors to sage green. Swap the rug for jute".to_string())
        );
        assert_eq!(
            compose_edit_instructions(Some("navy"), None),
            Some("Change the colors to navy.".to_string())
        );
        assert_eq!(compose_edit_instructions(Some("  "), None), None);
    }
}

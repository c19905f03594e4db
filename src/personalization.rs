use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::catalog::{
    AgeAdaptation, AgeBand, ArcCatalog, CallDuration, ConversationArc, TimingGuideline,
};
use crate::error::ApiError;

/// Gender-neutral term substituted into greeting templates.
const CHILD_TERM: &str = "child";

/// A conversation arc merged with the age- and duration-specific data a
/// single call needs. Always a copy; the catalog itself is never touched.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedArc {
    pub arc: ConversationArc,
    pub age_band: AgeBand,
    pub age_adaptation: AgeAdaptation,
    pub timing: TimingGuideline,
}

/// Picks a greeting template at random from the child's age band and fills
/// in the placeholders. The random source is injected so tests can seed it;
/// production callers pass `rand::thread_rng()`.
pub fn render_greeting<R: Rng>(
    catalog: &ArcCatalog,
    child_name: &str,
    child_age: u8,
    rng: &mut R,
) -> Result<String, ApiError> {
    let band = AgeBand::for_age(child_age);
    let template = catalog
        .greeting_templates
        .get(&band)
        .and_then(|templates| templates.choose(rng))
        .ok_or_else(|| {
            ApiError::Configuration(format!("No greeting templates configured for ages {}", band))
        })?;

    Ok(template
        .replace("{child_name}", child_name)
        .replace("{child}", CHILD_TERM))
}

pub fn build_arc(
    catalog: &ArcCatalog,
    duration: CallDuration,
    child_age: u8,
) -> Result<RenderedArc, ApiError> {
    let band = AgeBand::for_age(child_age);

    let arc = catalog.arcs.get(&duration).cloned().ok_or_else(|| {
        ApiError::Configuration(format!("No conversation arc configured for '{}'", duration))
    })?;
    let age_adaptation = catalog.age_adaptations.get(&band).cloned().ok_or_else(|| {
        ApiError::Configuration(format!("No age adaptation configured for ages {}", band))
    })?;
    let timing = catalog
        .timing_guidelines
        .get(&duration)
        .copied()
        .ok_or_else(|| {
            ApiError::Configuration(format!("No timing guidelines configured for '{}'", duration))
        })?;

    Ok(RenderedArc {
        arc,
        age_band: band,
        age_adaptation,
        timing,
    })
}

/// Assembles the conversational context sent to the video provider.
/// Deterministic for a given set of inputs, including the chosen greeting.
pub fn render_system_prompt(
    child_name: &str,
    child_age: u8,
    duration: CallDuration,
    greeting: &str,
    rendered: &RenderedArc,
) -> String {
    let arc = &rendered.arc;
    let adaptation = &rendered.age_adaptation;
    let timing = &rendered.timing;

    let mut prompt = format!(
        "PERSONALIZED CONVERSATION CONTEXT:\n\n\
         Child Information:\n\
         - Name: {}\n\
         - Age: {} years old\n\
         - Call Duration: {} ({} seconds)\n\
         - Language Level: {}\n\n\
         MANDATORY GREETING:\n\
         Start the conversation with: \"{}\"\n\n\
         CONVERSATION STRUCTURE:\n\
         You must follow this {} arc with {} phases:\n",
        child_name,
        child_age,
        duration,
        arc.total_duration_seconds,
        adaptation.language_level,
        greeting,
        duration,
        arc.phases.len(),
    );

    for (index, phase) in arc.phases.iter().enumerate() {
        prompt.push_str(&format!(
            "\nPhase {}: {} ({}s - {}%)\nGoals:\n",
            index + 1,
            humanize_phase_name(&phase.name),
            phase.duration_seconds,
            phase.percentage,
        ));
        for goal in &phase.goals {
            prompt.push_str(&format!("  - {}\n", goal));
        }
        prompt.push_str("\nGuidelines:\n");
        for guideline in &phase.santa_guidelines {
            prompt.push_str(&format!("  - {}\n", guideline));
        }
        if let Some(questions) = &phase.suggested_questions {
            prompt.push_str("\nSuggested Questions:\n");
            for question in questions {
                prompt.push_str(&format!("  - {}\n", question));
            }
        }
    }

    prompt.push_str(&format!(
        "\nAGE-SPECIFIC ADAPTATIONS (Age {}):\n\
         - Response Length: {}\n\
         - Sentence Complexity: {}\n\
         - Energy Level: {}\n\
         - Attention Span: {}\n\n\
         TIMING GUIDELINES:\n\
         - Average response: {} seconds\n\
         - Max response: {} seconds\n\
         - Pause between responses: {} seconds\n",
        child_age,
        adaptation.response_length,
        adaptation.sentence_complexity,
        adaptation.energy,
        adaptation.attention_span,
        timing.average_response_length_seconds,
        timing.max_response_length_seconds,
        timing.pause_between_responses_seconds,
    ));

    prompt.push_str(&format!(
        "\nCONVERSATION RULES:\n\
         1. Use {}'s name naturally 2-3 times per minute\n\
         2. Keep responses within time limits for your age group\n\
         3. Listen actively - reference what the child says\n\
         4. Never promise specific gifts - use \"I'll see what I can do\" or \"I'll talk to my elves\"\n\
         5. Stay in character as Santa Claus at all times\n\
         6. If child shows objects, acknowledge and comment on them\n\
         7. Keep the magic of Christmas alive\n\
         8. Be warm, encouraging, and kind\n\
         9. Follow the phase structure but allow natural conversation flow\n\
         10. If running long, gracefully transition to closing phase\n\n\
         QUALITY INDICATORS:\n\
         - Child is engaged and responding\n\
         - Conversation feels natural, not scripted\n\
         - Child seems comfortable and happy\n\
         - Name usage feels natural, not forced\n\
         - Transitions between phases are smooth\n\n\
         Remember: You are Santa Claus. Be magical, kind, and create a memorable experience for {}!\n",
        child_name, child_name,
    ));

    prompt
}

/// `wishlist_and_dreams` -> `Wishlist And Dreams`
fn humanize_phase_name(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

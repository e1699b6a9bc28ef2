//! Built-in canvas types and layouts
//!
//! Shipped with the binary so a fresh install has something to start from.
//! Deployments may replace them through a catalog source.

use crate::document::{CanvasType, SectionDefinition};
use crate::grid::{AreaSpec, GridTemplate};
use crate::layout::{synthesize_default, NamedLayout};

fn area(row: usize, col: usize, height: usize, width: usize) -> Option<AreaSpec> {
    Some(AreaSpec::spanning(row, col, height, width))
}

/// Nine-section layout shared by the Business Model and Lean canvases
#[must_use]
pub fn classic_nine() -> GridTemplate {
    GridTemplate::uniform(
        5,
        3,
        vec![
            area(0, 0, 2, 1),
            area(0, 1, 1, 1),
            area(1, 1, 1, 1),
            area(0, 2, 2, 1),
            area(0, 3, 1, 1),
            area(1, 3, 1, 1),
            area(0, 4, 2, 1),
            area(2, 0, 1, 2),
            area(2, 2, 1, 3),
        ],
    )
}

fn quadrants() -> GridTemplate {
    GridTemplate::uniform(
        2,
        2,
        vec![area(0, 0, 1, 1), area(0, 1, 1, 1), area(1, 0, 1, 1), area(1, 1, 1, 1)],
    )
}

fn feature_four() -> GridTemplate {
    GridTemplate::uniform(
        3,
        2,
        vec![area(0, 0, 1, 3), area(1, 0, 1, 1), area(1, 1, 1, 1), area(1, 2, 1, 1)],
    )
}

fn columns_three() -> GridTemplate {
    GridTemplate::uniform(3, 1, vec![area(0, 0, 1, 1), area(0, 1, 1, 1), area(0, 2, 1, 1)])
}

fn stacked_six() -> GridTemplate {
    GridTemplate::uniform(
        2,
        3,
        vec![
            area(0, 0, 1, 1),
            area(0, 1, 1, 1),
            area(1, 0, 1, 1),
            area(1, 1, 1, 1),
            area(2, 0, 1, 1),
            area(2, 1, 1, 1),
        ],
    )
}

/// Named layouts known out of the box
#[must_use]
pub fn builtin_layouts() -> Vec<NamedLayout> {
    vec![
        NamedLayout::new("classic-9", "Classic", classic_nine()),
        NamedLayout::new("quadrants-4", "Quadrants", quadrants()),
        NamedLayout::new("feature-4", "Feature row", feature_four()),
        NamedLayout::new("columns-3", "Three columns", columns_three()),
        NamedLayout::new("stacked-6", "Stacked pairs", stacked_six()),
        NamedLayout::new("grid-6", "Grid", synthesize_default(6)),
    ]
}

fn canvas_type(
    id: &str,
    name: &str,
    description: &str,
    sections: &[(&str, &str)],
    default_layout: GridTemplate,
) -> CanvasType {
    CanvasType {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        sections: sections
            .iter()
            .enumerate()
            .map(|(i, (name, placeholder))| SectionDefinition::new(*name, *placeholder, i as u32))
            .collect(),
        default_layout,
    }
}

/// Canvas types known out of the box
#[must_use]
pub fn builtin_canvas_types() -> Vec<CanvasType> {
    vec![
        canvas_type(
            "business-model",
            "Business Model Canvas",
            "How an organization creates, delivers and captures value",
            &[
                ("Key Partners", "Who are your key partners and suppliers?"),
                ("Key Activities", "What key activities does your value proposition require?"),
                ("Key Resources", "What key resources does your value proposition require?"),
                ("Value Propositions", "What value do you deliver to the customer?"),
                ("Customer Relationships", "What relationship does each segment expect?"),
                ("Channels", "Through which channels do your segments want to be reached?"),
                ("Customer Segments", "For whom are you creating value?"),
                ("Cost Structure", "What are the most important costs in your model?"),
                ("Revenue Streams", "For what value are customers willing to pay?"),
            ],
            classic_nine(),
        ),
        canvas_type(
            "lean",
            "Lean Canvas",
            "Problem-first startup plan",
            &[
                ("Problem", "Top three problems"),
                ("Solution", "Top three features"),
                ("Key Metrics", "Key activities you measure"),
                ("Unique Value Proposition", "Single, clear, compelling message"),
                ("Unfair Advantage", "Can't be easily copied or bought"),
                ("Channels", "Path to customers"),
                ("Customer Segments", "Target customers"),
                ("Cost Structure", "Customer acquisition, distribution, hosting, people"),
                ("Revenue Streams", "Revenue model, lifetime value, gross margin"),
            ],
            classic_nine(),
        ),
        canvas_type(
            "swot",
            "SWOT Analysis",
            "Strengths, weaknesses, opportunities and threats",
            &[
                ("Strengths", "What do you do well?"),
                ("Weaknesses", "Where could you improve?"),
                ("Opportunities", "What trends could you use?"),
                ("Threats", "What obstacles do you face?"),
            ],
            quadrants(),
        ),
        canvas_type(
            "empathy-map",
            "Empathy Map",
            "What a customer says, thinks, does and feels",
            &[
                ("Says", "Quotes and defining words"),
                ("Thinks", "Thoughts and beliefs"),
                ("Does", "Actions and behaviours"),
                ("Feels", "Emotions"),
                ("Pains", "Fears, frustrations, obstacles"),
                ("Gains", "Wants, needs, measures of success"),
            ],
            stacked_six(),
        ),
        canvas_type(
            "value-proposition",
            "Value Proposition Canvas",
            "Fit between what you offer and what customers need",
            &[
                ("Products & Services", "What you offer"),
                ("Gain Creators", "How you create customer gains"),
                ("Pain Relievers", "How you relieve customer pains"),
                ("Customer Jobs", "What customers are trying to get done"),
                ("Gains", "Outcomes customers want"),
                ("Pains", "Risks and obstacles customers face"),
            ],
            synthesize_default(6),
        ),
    ]
}

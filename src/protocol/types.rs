use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded `event:` + `data:` record from the pipeline stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event_type: String,
    pub data: Value,
}

impl EventRecord {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }
}

/// Typed pipeline event, one variant per stage the service reports.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Start(StartPayload),
    Generator(GeneratorPayload),
    Researcher(ResearchGuide),
    Recruiter(RecruiterPayload),
    Simulation(SimulationPayload),
    Analyst(AnalystReport),
    Critic(Critique),
    Complete(CompletePayload),
    Error(ErrorPayload),
    /// An event type this client does not know. Applying it changes nothing.
    Other { event_type: String },
}

impl PipelineEvent {
    /// Convert a decoded record into a typed event.
    ///
    /// Unknown event types map to [`PipelineEvent::Other`]. A known type whose
    /// payload doesn't fit the expected shape returns `Err` (caller drops it).
    pub fn from_record(record: EventRecord) -> serde_json::Result<Self> {
        let EventRecord { event_type, data } = record;
        let event = match event_type.as_str() {
            "start" => Self::Start(serde_json::from_value(data)?),
            "generator" => Self::Generator(serde_json::from_value(data)?),
            "researcher" => Self::Researcher(serde_json::from_value(data)?),
            "recruiter" => Self::Recruiter(serde_json::from_value(data)?),
            "simulation" => Self::Simulation(serde_json::from_value(data)?),
            "analyst" => Self::Analyst(serde_json::from_value(data)?),
            "critic" => Self::Critic(serde_json::from_value(data)?),
            "complete" => Self::Complete(serde_json::from_value(data)?),
            "error" => Self::Error(serde_json::from_value(data)?),
            _ => Self::Other { event_type },
        };
        Ok(event)
    }

    /// Wire name of the event type.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Start(_) => "start",
            Self::Generator(_) => "generator",
            Self::Researcher(_) => "researcher",
            Self::Recruiter(_) => "recruiter",
            Self::Simulation(_) => "simulation",
            Self::Analyst(_) => "analyst",
            Self::Critic(_) => "critic",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
            Self::Other { event_type } => event_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartPayload {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub idea: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorPayload {
    pub iteration: u32,
    pub idea: Idea,
}

/// A generated startup concept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub monetization_strategy: String,
    #[serde(default)]
    pub target_audience: String,
}

/// Hypotheses and interview script produced by the researcher stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchGuide {
    #[serde(default)]
    pub personas: Vec<TargetPersona>,
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
    #[serde(default)]
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetPersona {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub archetype: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// "Problem", "Solution" or "Monetization".
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruiterPayload {
    pub personas: Vec<RecruitedPersona>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecruitedPersona {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub company_context: String,
    #[serde(default)]
    pub key_frustrations: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPayload {
    pub interviews: Vec<Interview>,
}

/// Outcome of one simulated customer interview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    #[serde(default)]
    pub persona: InterviewPersona,
    #[serde(default)]
    pub pain_level: u32,
    #[serde(default)]
    pub willingness_to_pay: u32,
    #[serde(default)]
    pub transcript_summary: String,
    #[serde(default)]
    pub full_transcript: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewPersona {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalystReport {
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub confirmed_hypotheses: Vec<String>,
    #[serde(default)]
    pub rejected_hypotheses: Vec<String>,
    #[serde(default)]
    pub pivot_recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub score: u32,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub total_events: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
}

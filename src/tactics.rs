//! Built-in catalog of manipulation tactics.
//!
//! Each tactic has a stable name (used as the key inside a chunk's
//! `manipulation_tactics` mapping) and a short list of concrete examples
//! that anchor the severity prompt.

#[derive(Debug)]
pub struct TacticDef {
    pub name: &'static str,
    pub examples: &'static [&'static str],
}

pub const TACTICS: &[TacticDef] = &[
    TacticDef {
        name: "gaslighting",
        examples: &[
            "Telling a partner 'You're just being paranoid'",
            "Insisting events didn't happen",
            "Denying discussions or agreements made previously",
            "Telling an employee 'I never said that' when they remember differently",
        ],
    },
    TacticDef {
        name: "silent_treatment",
        examples: &[
            "Ignoring a partner for days",
            "Leaving a room each time they speak",
            "Ignoring emails or messages for days",
            "Avoiding interaction as a form of punishment",
        ],
    },
    TacticDef {
        name: "love_bombing",
        examples: &[
            "Constantly giving compliments to win trust",
            "Showering with gifts",
            "Constantly praising an employee to build dependency",
            "Offering excessive praise to manipulate trust",
        ],
    },
    TacticDef {
        name: "projection",
        examples: &[
            "Accusing a partner of cheating",
            "Telling them they are secretive",
            "Accusing someone of bad work habits they themselves have",
            "Projecting personal frustrations by accusing others",
        ],
    },
    TacticDef {
        name: "triangulation",
        examples: &[
            "Saying 'Even my friend agrees' to sway opinions",
            "Inviting a third person to side with them in arguments",
            "Discussing another employee's performance to create rivalries",
            "Creating triangles by discussing issues with third parties",
        ],
    },
];

/// Look up a tactic by name.
pub fn find(name: &str) -> Option<&'static TacticDef> {
    TACTICS.iter().find(|t| t.name == name)
}

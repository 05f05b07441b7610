//! Characteristic names, categories and stereotype-risk levels.
//!
//! `Characteristic` is the closed set of persona attributes. Its declaration
//! order is the catalog order: definitions, persona maps and printed tables
//! all follow it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! characteristics {
    ($($variant:ident => $name:literal,)+) => {
        /// Every attribute a persona carries, one value each.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum Characteristic {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Characteristic {
            /// All characteristics in catalog order.
            pub fn all() -> &'static [Characteristic] {
                &[$(Characteristic::$variant,)+]
            }

            /// Snake-case name used in tables, JSON and the CLI.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Characteristic::$variant => $name,)+
                }
            }
        }

        impl FromStr for Characteristic {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Characteristic::$variant),)+
                    _ => Err(format!("Unknown characteristic: '{}'", s)),
                }
            }
        }
    };
}

characteristics! {
    // Demographic
    Age => "age",
    Gender => "gender",
    EducationLevel => "education_level",
    IncomeBracket => "income_bracket",
    MaritalStatus => "marital_status",
    HouseholdSize => "household_size",
    ChildrenCount => "children_count",
    EmploymentStatus => "employment_status",
    OccupationSector => "occupation_sector",
    ResidenceType => "residence_type",
    GeographicRegion => "geographic_region",
    UrbanRural => "urban_rural",
    LanguagePreference => "language_preference",
    GenerationalCohort => "generational_cohort",
    SocioeconomicMobility => "socioeconomic_mobility",

    // Psychographic
    PersonalityOpenness => "personality_openness",
    PersonalityConscientiousness => "personality_conscientiousness",
    PersonalityExtraversion => "personality_extraversion",
    PersonalityAgreeableness => "personality_agreeableness",
    PersonalityNeuroticism => "personality_neuroticism",
    RiskTolerance => "risk_tolerance",
    DecisionMakingStyle => "decision_making_style",
    ValuesFamily => "values_family",
    ValuesTradition => "values_tradition",
    ValuesAchievement => "values_achievement",
    ValuesSecurity => "values_security",
    ValuesHedonism => "values_hedonism",
    SocialInfluenceSusceptibility => "social_influence_susceptibility",
    TechnologyAdoption => "technology_adoption",
    BrandLoyaltyTendency => "brand_loyalty_tendency",
    PriceSensitivity => "price_sensitivity",
    EnvironmentalConsciousness => "environmental_consciousness",
    SocialResponsibilityImportance => "social_responsibility_importance",
    InformationSeekingBehavior => "information_seeking_behavior",
    CulturalIdentityStrength => "cultural_identity_strength",

    // Behavioral
    MediaConsumptionTv => "media_consumption_tv",
    MediaConsumptionRadio => "media_consumption_radio",
    MediaConsumptionSocial => "media_consumption_social",
    ShoppingFrequency => "shopping_frequency",
    ShoppingPreference => "shopping_preference",
    BrandSwitchingFrequency => "brand_switching_frequency",
    ComplaintBehavior => "complaint_behavior",
    WordOfMouthTendency => "word_of_mouth_tendency",
    SocialMediaActivity => "social_media_activity",
    PreferredCommunication => "preferred_communication",
    PaymentPreference => "payment_preference",
    LoyaltyProgramParticipation => "loyalty_program_participation",
    TimeOfDayPreference => "time_of_day_preference",
    WeekendVsWeekday => "weekend_vs_weekday",
    ImpulseBuyingTendency => "impulse_buying_tendency",
    ResearchBeforePurchase => "research_before_purchase",
    SeasonalBehaviorChange => "seasonal_behavior_change",
    GroupVsIndividualDecisions => "group_vs_individual_decisions",
    BrandAdvocacyLevel => "brand_advocacy_level",
    CustomerServiceExpectations => "customer_service_expectations",

    // Communication
    CommunicationStyle => "communication_style",
    FormalityPreference => "formality_preference",
    HumorAppreciation => "humor_appreciation",
    EmotionalExpressiveness => "emotional_expressiveness",
    AttentionSpan => "attention_span",
    PreferredContentType => "preferred_content_type",
    LocalExpressionsUsage => "local_expressions_usage",
    SkepticismLevel => "skepticism_level",
    AuthorityRespect => "authority_respect",
    SocialDesirabilityBias => "social_desirability_bias",

    // Lifestyle
    LifestyleActivityLevel => "lifestyle_activity_level",
    HobbiesInterests => "hobbies_interests",
    EntertainmentPreference => "entertainment_preference",
    SocialCircleSize => "social_circle_size",
    TravelFrequency => "travel_frequency",
    HealthConsciousness => "health_consciousness",
    FitnessRoutine => "fitness_routine",
    DietPreferences => "diet_preferences",
    SleepSchedule => "sleep_schedule",
    StressLevel => "stress_level",
    WorkLifeBalance => "work_life_balance",
    ReligiousSpirituality => "religious_spirituality",
    CommunityInvolvement => "community_involvement",
    FinancialPlanning => "financial_planning",
    LearningOrientation => "learning_orientation",

    // Domain (telecom)
    ServiceType => "service_type",
    MonthlySpend => "monthly_spend",
    DataUsageGb => "data_usage_gb",
    CallMinutesMonthly => "call_minutes_monthly",
    SmsUsage => "sms_usage",
    InternetPrimaryUse => "internet_primary_use",
    RoamingUsage => "roaming_usage",
    ServiceBundling => "service_bundling",
    DeviceBrand => "device_brand",
    DeviceAge => "device_age",
    DeviceUpgradeFrequency => "device_upgrade_frequency",
    TechFeaturePriority => "tech_feature_priority",
    WifiVsMobileData => "wifi_vs_mobile_data",
    AppUsagePattern => "app_usage_pattern",
    CurrentOperator => "current_operator",
    OperatorLoyalty => "operator_loyalty",
    BrandPerceptionTigo => "brand_perception_tigo",
    BrandPerceptionClaro => "brand_perception_claro",
    SwitchingConsideration => "switching_consideration",
    RecommendationLikelihood => "recommendation_likelihood",
    NetworkQualityImportance => "network_quality_importance",
    CustomerServiceExperience => "customer_service_experience",
    PriceSensitivityTelecom => "price_sensitivity_telecom",
    ServiceInterruptionTolerance => "service_interruption_tolerance",
    DigitalServiceAdoption => "digital_service_adoption",
}

impl Characteristic {
    /// Position in catalog order.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Category
// ─────────────────────────────────────────────────────────────────

/// Catalog section a characteristic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicCategory {
    Demographic,
    Psychographic,
    Behavioral,
    Communication,
    Lifestyle,
    /// Industry-specific attributes (telecom).
    Domain,
}

impl CharacteristicCategory {
    pub fn slug(&self) -> &'static str {
        match self {
            CharacteristicCategory::Demographic => "demographic",
            CharacteristicCategory::Psychographic => "psychographic",
            CharacteristicCategory::Behavioral => "behavioral",
            CharacteristicCategory::Communication => "communication",
            CharacteristicCategory::Lifestyle => "lifestyle",
            CharacteristicCategory::Domain => "domain",
        }
    }

    pub fn all() -> &'static [CharacteristicCategory] {
        &[
            CharacteristicCategory::Demographic,
            CharacteristicCategory::Psychographic,
            CharacteristicCategory::Behavioral,
            CharacteristicCategory::Communication,
            CharacteristicCategory::Lifestyle,
            CharacteristicCategory::Domain,
        ]
    }
}

impl fmt::Display for CharacteristicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CharacteristicCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CharacteristicCategory::all()
            .iter()
            .find(|c| c.slug() == s.to_lowercase())
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown category: '{}'. Valid: demographic, psychographic, behavioral, communication, lifestyle, domain",
                    s
                )
            })
    }
}

// ─────────────────────────────────────────────────────────────────
// Stereotype Risk
// ─────────────────────────────────────────────────────────────────

/// How likely a characteristic is to carry stereotyped correlations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StereotypeRisk {
    #[default]
    Low,
    Medium,
    High,
}

impl StereotypeRisk {
    /// Medium and high risk entries get counter-stereotypical sampling.
    pub fn is_elevated(&self) -> bool {
        *self >= StereotypeRisk::Medium
    }

    /// Contribution to a persona's bias-risk score.
    pub fn risk_weight(&self) -> f64 {
        match self {
            StereotypeRisk::Low => 0.0,
            StereotypeRisk::Medium => 0.2,
            StereotypeRisk::High => 0.5,
        }
    }
}

impl fmt::Display for StereotypeRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StereotypeRisk::Low => "low",
            StereotypeRisk::Medium => "medium",
            StereotypeRisk::High => "high",
        };
        f.write_str(s)
    }
}

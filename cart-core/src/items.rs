//! Closed game item sets with fixed ordinals.
//!
//! The ordinal assignment of every enum here is part of the draw contract:
//! pools index items by position, so reordering a variant changes every
//! sampled value for every seed. Append-only.
//!
//! Name lookup is case- and punctuation-insensitive ("8 Ball" == "8ball"),
//! which is what the filter loader relies on.

use serde::Deserialize as _;

/// Lower-case alphanumeric fold used for all name lookups.
pub fn fold_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All variants in ordinal order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Number of variants.
            pub const COUNT: usize = $name::ALL.len();

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            #[inline]
            pub fn ordinal(self) -> u8 {
                self as u8
            }

            #[inline]
            pub fn from_ordinal(ord: u8) -> Option<$name> {
                $name::ALL.get(ord as usize).copied()
            }

            /// Case- and punctuation-insensitive lookup. The type name is
            /// accepted as a trailing qualifier ("Red Deck" == "Red").
            pub fn from_name(s: &str) -> Option<$name> {
                let want = fold_name(s);
                let kind = fold_name(stringify!($name));
                $name::ALL.iter().copied().find(|v| {
                    let base = fold_name(v.name());
                    want == base || (want.len() == base.len() + kind.len()
                        && want.starts_with(base.as_str())
                        && want.ends_with(kind.as_str()))
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(self.name())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                $name::from_name(&s).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} {:?}",
                        stringify!($name),
                        s
                    ))
                })
            }
        }
    };
}

closed_enum! {
    /// Starting deck.
    Deck {
        Red = "Red",
        Blue = "Blue",
        Yellow = "Yellow",
        Green = "Green",
        Black = "Black",
        Magic = "Magic",
        Nebula = "Nebula",
        Ghost = "Ghost",
        Abandoned = "Abandoned",
        Checkered = "Checkered",
        Zodiac = "Zodiac",
        Painted = "Painted",
        Anaglyph = "Anaglyph",
        Plasma = "Plasma",
        Erratic = "Erratic",
    }
}

closed_enum! {
    /// Difficulty stake.
    Stake {
        White = "White",
        Red = "Red",
        Green = "Green",
        Black = "Black",
        Blue = "Blue",
        Purple = "Purple",
        Orange = "Orange",
        Gold = "Gold",
    }
}

closed_enum! {
    /// Joker rarity class.
    Rarity {
        Common = "Common",
        Uncommon = "Uncommon",
        Rare = "Rare",
        Legendary = "Legendary",
    }
}

closed_enum! {
    /// Cosmetic/mechanical modifier on a sampled item.
    Edition {
        None = "None",
        Foil = "Foil",
        Holo = "Holo",
        Polychrome = "Polychrome",
        Negative = "Negative",
    }
}

closed_enum! {
    /// Playing-card enhancement.
    Enhancement {
        None = "None",
        Bonus = "Bonus",
        Mult = "Mult",
        Wild = "Wild",
        Glass = "Glass",
        Steel = "Steel",
        Stone = "Stone",
        Gold = "Gold",
        Lucky = "Lucky",
    }
}

closed_enum! {
    /// Joker sticker; higher stakes open more of the pool.
    Sticker {
        None = "None",
        Eternal = "Eternal",
        Perishable = "Perishable",
        Rental = "Rental",
    }
}

closed_enum! {
    /// Playing-card seal.
    Seal {
        None = "None",
        Red = "Red Seal",
        Blue = "Blue Seal",
        Gold = "Gold Seal",
        Purple = "Purple Seal",
    }
}

closed_enum! {
    /// Playing-card rank.
    Rank {
        Two = "2",
        Three = "3",
        Four = "4",
        Five = "5",
        Six = "6",
        Seven = "7",
        Eight = "8",
        Nine = "9",
        Ten = "10",
        Jack = "Jack",
        Queen = "Queen",
        King = "King",
        Ace = "Ace",
    }
}

closed_enum! {
    /// Playing-card suit.
    Suit {
        Hearts = "Hearts",
        Clubs = "Clubs",
        Diamonds = "Diamonds",
        Spades = "Spades",
    }
}

closed_enum! {
    /// Where a joker draw comes from within an ante.
    Source {
        Shop = "Shop",
        Pack = "Pack",
    }
}

closed_enum! {
    /// Shop vouchers.
    Voucher {
        Overstock = "Overstock",
        OverstockPlus = "Overstock Plus",
        ClearanceSale = "Clearance Sale",
        Liquidation = "Liquidation",
        Hone = "Hone",
        GlowUp = "Glow Up",
        RerollSurplus = "Reroll Surplus",
        RerollGlut = "Reroll Glut",
        CrystalBall = "Crystal Ball",
        OmenGlobe = "Omen Globe",
        Telescope = "Telescope",
        Observatory = "Observatory",
        Grabber = "Grabber",
        NachoTong = "Nacho Tong",
        Wasteful = "Wasteful",
        Recyclomancy = "Recyclomancy",
        TarotMerchant = "Tarot Merchant",
        TarotTycoon = "Tarot Tycoon",
        PlanetMerchant = "Planet Merchant",
        PlanetTycoon = "Planet Tycoon",
        SeedMoney = "Seed Money",
        MoneyTree = "Money Tree",
        Blank = "Blank",
        Antimatter = "Antimatter",
        MagicTrick = "Magic Trick",
        Illusion = "Illusion",
        Hieroglyph = "Hieroglyph",
        Petroglyph = "Petroglyph",
        DirectorsCut = "Director's Cut",
        Retcon = "Retcon",
        PaintBrush = "Paint Brush",
        Palette = "Palette",
    }
}

closed_enum! {
    /// Blind skip tags; two are offered per ante.
    Tag {
        UncommonTag = "Uncommon Tag",
        RareTag = "Rare Tag",
        NegativeTag = "Negative Tag",
        FoilTag = "Foil Tag",
        HolographicTag = "Holographic Tag",
        PolychromeTag = "Polychrome Tag",
        InvestmentTag = "Investment Tag",
        VoucherTag = "Voucher Tag",
        BossTag = "Boss Tag",
        StandardTag = "Standard Tag",
        CharmTag = "Charm Tag",
        MeteorTag = "Meteor Tag",
        BuffoonTag = "Buffoon Tag",
        HandyTag = "Handy Tag",
        GarbageTag = "Garbage Tag",
        EtherealTag = "Ethereal Tag",
        CouponTag = "Coupon Tag",
        DoubleTag = "Double Tag",
        JuggleTag = "Juggle Tag",
        D6Tag = "D6 Tag",
        TopUpTag = "Top-up Tag",
        SpeedTag = "Speed Tag",
        OrbitalTag = "Orbital Tag",
        EconomyTag = "Economy Tag",
    }
}

closed_enum! {
    /// Tarot cards.
    Tarot {
        TheFool = "The Fool",
        TheMagician = "The Magician",
        TheHighPriestess = "The High Priestess",
        TheEmpress = "The Empress",
        TheEmperor = "The Emperor",
        TheHierophant = "The Hierophant",
        TheLovers = "The Lovers",
        TheChariot = "The Chariot",
        Justice = "Justice",
        TheHermit = "The Hermit",
        TheWheelOfFortune = "The Wheel of Fortune",
        Strength = "Strength",
        TheHangedMan = "The Hanged Man",
        Death = "Death",
        Temperance = "Temperance",
        TheDevil = "The Devil",
        TheTower = "The Tower",
        TheStar = "The Star",
        TheMoon = "The Moon",
        TheSun = "The Sun",
        Judgement = "Judgement",
        TheWorld = "The World",
    }
}

closed_enum! {
    /// Planet cards.
    Planet {
        Mercury = "Mercury",
        Venus = "Venus",
        Earth = "Earth",
        Mars = "Mars",
        Jupiter = "Jupiter",
        Saturn = "Saturn",
        Uranus = "Uranus",
        Neptune = "Neptune",
        Pluto = "Pluto",
        PlanetX = "Planet X",
        Ceres = "Ceres",
        Eris = "Eris",
    }
}

closed_enum! {
    /// Spectral cards.
    Spectral {
        Familiar = "Familiar",
        Grim = "Grim",
        Incantation = "Incantation",
        Talisman = "Talisman",
        Aura = "Aura",
        Wraith = "Wraith",
        Sigil = "Sigil",
        Ouija = "Ouija",
        Ectoplasm = "Ectoplasm",
        Immolate = "Immolate",
        Ankh = "Ankh",
        DejaVu = "Deja Vu",
        Hex = "Hex",
        Trance = "Trance",
        Medium = "Medium",
        Cryptid = "Cryptid",
        TheSoul = "The Soul",
        BlackHole = "Black Hole",
    }
}

closed_enum! {
    /// Boss blinds. Ordinals 0..23 are the regular rotation; 23.. are the
    /// ante-8 finishers (see `Boss::is_finisher`).
    Boss {
        TheHook = "The Hook",
        TheOx = "The Ox",
        TheHouse = "The House",
        TheWall = "The Wall",
        TheWheel = "The Wheel",
        TheArm = "The Arm",
        TheClub = "The Club",
        TheFish = "The Fish",
        ThePsychic = "The Psychic",
        TheGoad = "The Goad",
        TheWater = "The Water",
        TheWindow = "The Window",
        TheManacle = "The Manacle",
        TheEye = "The Eye",
        TheMouth = "The Mouth",
        ThePlant = "The Plant",
        TheSerpent = "The Serpent",
        ThePillar = "The Pillar",
        TheNeedle = "The Needle",
        TheHead = "The Head",
        TheTooth = "The Tooth",
        TheFlint = "The Flint",
        TheMark = "The Mark",
        AmberAcorn = "Amber Acorn",
        VerdantLeaf = "Verdant Leaf",
        VioletVessel = "Violet Vessel",
        CrimsonHeart = "Crimson Heart",
        CeruleanBell = "Cerulean Bell",
    }
}

/// First finisher ordinal; everything below rotates in antes 1..=7.
pub const BOSS_FINISHER_START: u8 = 23;

impl Boss {
    /// Finisher bosses only appear on ante 8.
    #[inline]
    pub fn is_finisher(self) -> bool {
        self.ordinal() >= BOSS_FINISHER_START
    }

    pub fn regulars() -> &'static [Boss] {
        &Boss::ALL[..BOSS_FINISHER_START as usize]
    }

    pub fn finishers() -> &'static [Boss] {
        &Boss::ALL[BOSS_FINISHER_START as usize..]
    }
}

closed_enum! {
    /// Every joker, grouped by rarity block: commons, then uncommons, then
    /// rares, then legendaries. `Joker::rarity` relies on the block bounds.
    Joker {
        // Commons.
        TheJoker = "Joker",
        GreedyJoker = "Greedy Joker",
        LustyJoker = "Lusty Joker",
        WrathfulJoker = "Wrathful Joker",
        GluttonousJoker = "Gluttonous Joker",
        JollyJoker = "Jolly Joker",
        ZanyJoker = "Zany Joker",
        MadJoker = "Mad Joker",
        CrazyJoker = "Crazy Joker",
        DrollJoker = "Droll Joker",
        SlyJoker = "Sly Joker",
        WilyJoker = "Wily Joker",
        CleverJoker = "Clever Joker",
        DeviousJoker = "Devious Joker",
        CraftyJoker = "Crafty Joker",
        HalfJoker = "Half Joker",
        CreditCard = "Credit Card",
        Banner = "Banner",
        MysticSummit = "Mystic Summit",
        EightBall = "8 Ball",
        Misprint = "Misprint",
        RaisedFist = "Raised Fist",
        ChaosTheClown = "Chaos the Clown",
        ScaryFace = "Scary Face",
        AbstractJoker = "Abstract Joker",
        DelayedGratification = "Delayed Gratification",
        GrosMichel = "Gros Michel",
        EvenSteven = "Even Steven",
        OddTodd = "Odd Todd",
        Scholar = "Scholar",
        BusinessCard = "Business Card",
        Supernova = "Supernova",
        RideTheBus = "Ride the Bus",
        Egg = "Egg",
        Runner = "Runner",
        IceCream = "Ice Cream",
        Splash = "Splash",
        BlueJoker = "Blue Joker",
        FacelessJoker = "Faceless Joker",
        GreenJoker = "Green Joker",
        Superposition = "Superposition",
        ToDoList = "To Do List",
        Cavendish = "Cavendish",
        RedCard = "Red Card",
        SquareJoker = "Square Joker",
        RiffRaff = "Riff-Raff",
        Photograph = "Photograph",
        ReservedParking = "Reserved Parking",
        MailInRebate = "Mail-In Rebate",
        Hallucination = "Hallucination",
        FortuneTeller = "Fortune Teller",
        Juggler = "Juggler",
        Drunkard = "Drunkard",
        GoldenJoker = "Golden Joker",
        Popcorn = "Popcorn",
        WalkieTalkie = "Walkie Talkie",
        SmileyFace = "Smiley Face",
        GoldenTicket = "Golden Ticket",
        Swashbuckler = "Swashbuckler",
        HangingChad = "Hanging Chad",
        ShootTheMoon = "Shoot the Moon",
        // Uncommons.
        JokerStencil = "Joker Stencil",
        FourFingers = "Four Fingers",
        Mime = "Mime",
        CeremonialDagger = "Ceremonial Dagger",
        MarbleJoker = "Marble Joker",
        LoyaltyCard = "Loyalty Card",
        Dusk = "Dusk",
        Fibonacci = "Fibonacci",
        SteelJoker = "Steel Joker",
        Hack = "Hack",
        Pareidolia = "Pareidolia",
        SpaceJoker = "Space Joker",
        Burglar = "Burglar",
        Blackboard = "Blackboard",
        SixthSense = "Sixth Sense",
        Constellation = "Constellation",
        Hiker = "Hiker",
        CardSharp = "Card Sharp",
        Madness = "Madness",
        Seance = "Seance",
        Vampire = "Vampire",
        Shortcut = "Shortcut",
        Hologram = "Hologram",
        Cloud9 = "Cloud 9",
        Rocket = "Rocket",
        MidasMask = "Midas Mask",
        Luchador = "Luchador",
        GiftCard = "Gift Card",
        TurtleBean = "Turtle Bean",
        Erosion = "Erosion",
        ToTheMoon = "To the Moon",
        StoneJoker = "Stone Joker",
        LuckyCat = "Lucky Cat",
        Bull = "Bull",
        DietCola = "Diet Cola",
        TradingCard = "Trading Card",
        FlashCard = "Flash Card",
        SpareTrousers = "Spare Trousers",
        Ramen = "Ramen",
        Seltzer = "Seltzer",
        Castle = "Castle",
        MrBones = "Mr. Bones",
        Acrobat = "Acrobat",
        SockAndBuskin = "Sock and Buskin",
        Troubadour = "Troubadour",
        Certificate = "Certificate",
        SmearedJoker = "Smeared Joker",
        Throwback = "Throwback",
        RoughGem = "Rough Gem",
        Bloodstone = "Bloodstone",
        Arrowhead = "Arrowhead",
        OnyxAgate = "Onyx Agate",
        GlassJoker = "Glass Joker",
        Showman = "Showman",
        FlowerPot = "Flower Pot",
        MerryAndy = "Merry Andy",
        OopsAllSixes = "Oops! All 6s",
        TheIdol = "The Idol",
        SeeingDouble = "Seeing Double",
        Matador = "Matador",
        Satellite = "Satellite",
        Cartomancer = "Cartomancer",
        Astronomer = "Astronomer",
        Bootstraps = "Bootstraps",
        // Rares.
        Dna = "DNA",
        Vagabond = "Vagabond",
        Baron = "Baron",
        Obelisk = "Obelisk",
        BaseballCard = "Baseball Card",
        AncientJoker = "Ancient Joker",
        Campfire = "Campfire",
        Blueprint = "Blueprint",
        WeeJoker = "Wee Joker",
        HitTheRoad = "Hit the Road",
        TheDuo = "The Duo",
        TheTrio = "The Trio",
        TheFamily = "The Family",
        TheOrder = "The Order",
        TheTribe = "The Tribe",
        Stuntman = "Stuntman",
        InvisibleJoker = "Invisible Joker",
        Brainstorm = "Brainstorm",
        DriversLicense = "Drivers License",
        BurntJoker = "Burnt Joker",
        // Legendaries.
        Canio = "Canio",
        Triboulet = "Triboulet",
        Yorick = "Yorick",
        Chicot = "Chicot",
        Perkeo = "Perkeo",
    }
}

/// Rarity block bounds within `Joker::ALL` (start of each block).
pub const JOKER_UNCOMMON_START: u8 = 61;
pub const JOKER_RARE_START: u8 = 125;
pub const JOKER_LEGENDARY_START: u8 = 145;

impl Joker {
    #[inline]
    pub fn rarity(self) -> Rarity {
        let ord = self.ordinal();
        if ord < JOKER_UNCOMMON_START {
            Rarity::Common
        } else if ord < JOKER_RARE_START {
            Rarity::Uncommon
        } else if ord < JOKER_LEGENDARY_START {
            Rarity::Rare
        } else {
            Rarity::Legendary
        }
    }

    /// The contiguous ordinal block of one rarity class.
    pub fn of_rarity(rarity: Rarity) -> &'static [Joker] {
        let (lo, hi) = match rarity {
            Rarity::Common => (0, JOKER_UNCOMMON_START),
            Rarity::Uncommon => (JOKER_UNCOMMON_START, JOKER_RARE_START),
            Rarity::Rare => (JOKER_RARE_START, JOKER_LEGENDARY_START),
            Rarity::Legendary => (JOKER_LEGENDARY_START, Joker::COUNT as u8),
        };
        &Joker::ALL[lo as usize..hi as usize]
    }
}

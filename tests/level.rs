//! Decoding a level file through all three surfaces: the raw reader,
//! structure bindings, and the dynamic value tree.
//!
//! The fixture mirrors the layout of a vanilla `level.dat` (after gzip
//! stripping): a root compound with a single child compound named `Data`.
use cobalt_nbt::err::ReadError;
use cobalt_nbt::{nbt_struct, Engine, NbtReader, NbtWriter, TagKind, TagSource, TagSink, Value};

fn level_bytes() -> Vec<u8> {
    let mut w = NbtWriter::new(vec![]);
    w.begin_compound().unwrap();
    w.name("Data").unwrap();
    w.begin_compound().unwrap();
    {
        w.name("Difficulty").unwrap();
        w.write_byte(1).unwrap();
        w.name("difficultyLocked").unwrap();
        w.write_byte(0).unwrap();
        w.name("thunderTime").unwrap();
        w.write_int(51264).unwrap();
        w.name("rainTime").unwrap();
        w.write_int(14590).unwrap();
        w.name("BorderSize").unwrap();
        w.write_double(1000.0).unwrap();
        w.name("BorderDamagePerBlock").unwrap();
        w.write_double(0.2).unwrap();
        w.name("LastPlayed").unwrap();
        w.write_long(1687182273928).unwrap();
        w.name("version").unwrap();
        w.write_int(19133).unwrap();
        w.name("ServerBrands").unwrap();
        w.begin_list(1).unwrap();
        w.write_string("Paper").unwrap();
        w.end_list().unwrap();
        w.name("SpawnAngle").unwrap();
        w.write_float(0.0).unwrap();
        w.name("LevelName").unwrap();
        w.write_string("world").unwrap();
        w.name("WorldGenSettings").unwrap();
        w.begin_compound().unwrap();
        {
            w.name("bonus_chest").unwrap();
            w.write_byte(0).unwrap();
            w.name("seed").unwrap();
            w.write_long(-6450009625622499088).unwrap();
        }
        w.end_compound().unwrap();
        // Entries no consumer below asks for, to exercise skipping.
        w.name("ScheduledEvents").unwrap();
        w.begin_list_of(0, TagKind::Compound).unwrap();
        w.end_list().unwrap();
        w.name("GameRules").unwrap();
        w.begin_compound().unwrap();
        w.name("doDaylightCycle").unwrap();
        w.write_string("true").unwrap();
        w.end_compound().unwrap();
    }
    w.end_compound().unwrap();
    w.end_compound().unwrap();
    w.close().unwrap()
}

#[test]
fn reader_walks_the_level_data() {
    let bytes = level_bytes();
    let mut r = NbtReader::new(bytes.as_slice());

    r.begin_compound().unwrap();
    assert_eq!(r.peek().unwrap(), TagKind::Compound);
    assert_eq!(r.name().unwrap(), "Data");
    r.begin_compound().unwrap();

    assert_eq!(r.name().unwrap(), "Difficulty");
    assert_eq!(r.read_byte().unwrap(), 1);
    r.skip(0).unwrap(); // difficultyLocked
    assert_eq!(r.name().unwrap(), "thunderTime");
    assert_eq!(r.read_int().unwrap(), 51264);
    r.skip(0).unwrap(); // rainTime
    assert_eq!(r.name().unwrap(), "BorderSize");
    assert_eq!(r.read_double().unwrap(), 1000.0);
    r.skip(0).unwrap(); // BorderDamagePerBlock
    assert_eq!(r.name().unwrap(), "LastPlayed");
    assert_eq!(r.read_long().unwrap(), 1687182273928);
    assert_eq!(r.name().unwrap(), "version");
    assert_eq!(r.read_int().unwrap(), 19133);

    assert_eq!(r.name().unwrap(), "ServerBrands");
    assert_eq!(r.begin_list().unwrap(), 1);
    assert_eq!(r.read_string().unwrap(), "Paper");
    r.end_list().unwrap();

    assert_eq!(r.name().unwrap(), "SpawnAngle");
    assert_eq!(r.read_float().unwrap(), 0.0);
    assert_eq!(r.name().unwrap(), "LevelName");
    assert_eq!(r.read_string().unwrap(), "world");

    assert_eq!(r.name().unwrap(), "WorldGenSettings");
    r.begin_compound().unwrap();
    r.skip(0).unwrap(); // bonus_chest
    assert_eq!(r.name().unwrap(), "seed");
    assert_eq!(r.read_long().unwrap(), -6450009625622499088);
    r.end_compound().unwrap();

    // Close out Data and the root with the rest unread.
    r.skip(2).unwrap();

    assert!(matches!(
        r.peek().unwrap_err().inner,
        ReadError::UnexpectedEnd
    ));
}

#[derive(Default, Debug, PartialEq)]
struct LevelFile {
    data: DataTag,
}

nbt_struct!(LevelFile {
    data as "Data": DataTag,
});

#[derive(Default, Debug, PartialEq)]
struct DataTag {
    difficulty: i32,
    difficulty_locked: bool,
    rain_time: i32,
    last_played: i64,
    border_damage_per_block: f64,
    level_name: String,
}

nbt_struct!(DataTag {
    difficulty as "Difficulty": i32,
    difficulty_locked as "difficultyLocked": bool,
    rain_time as "rainTime": i32,
    last_played as "LastPlayed": i64,
    border_damage_per_block as "BorderDamagePerBlock": f64,
    level_name as "LevelName": String,
});

#[test]
fn structure_binding_picks_its_fields() {
    let engine = Engine::new();
    let level: LevelFile = engine.from_bytes(&level_bytes()).unwrap();
    assert_eq!(level.data.difficulty, 1); // widened from the Byte tag
    assert!(!level.data.difficulty_locked);
    assert_eq!(level.data.rain_time, 14590);
    assert_eq!(level.data.last_played, 1687182273928);
    assert_eq!(level.data.border_damage_per_block, 0.2);
    assert_eq!(level.data.level_name, "world");
}

#[test]
fn any_value_decode_preserves_kinds() {
    let engine = Engine::new();
    let root: Value = engine.from_bytes(&level_bytes()).unwrap();

    let top = root.as_compound().unwrap();
    assert_eq!(top.keys().collect::<Vec<_>>(), ["Data"]);

    let data = root.get("Data").unwrap();
    assert!(matches!(data.get("Difficulty"), Some(Value::Byte(1))));
    assert!(matches!(data.get("thunderTime"), Some(Value::Int(51264))));
    assert!(matches!(data.get("BorderSize"), Some(Value::Double(_))));
    assert_eq!(data.get_double("BorderSize"), Some(1000.0));
    assert!(matches!(
        data.get("LastPlayed"),
        Some(Value::Long(1687182273928))
    ));
    assert!(matches!(data.get("version"), Some(Value::Int(19133))));
    assert_eq!(
        data.get_list("ServerBrands"),
        Some(vec![Value::String("Paper".to_string())])
    );
    assert!(matches!(data.get("SpawnAngle"), Some(Value::Float(_))));
    assert_eq!(data.get_string("LevelName").as_deref(), Some("world"));
    assert_eq!(
        data.get("WorldGenSettings").unwrap().get_long("seed"),
        Some(-6450009625622499088)
    );
}

#[test]
fn named_root_reads_and_writes() {
    let engine = Engine::new();
    let (name, _): (String, Value) = engine.read_named_from(level_bytes().as_slice()).unwrap();
    assert_eq!(name, "");

    let mut buf = vec![];
    engine
        .write_named_to("level", &Value::compound().with("a", 1i8).build(), &mut buf)
        .unwrap();
    let (name, value): (String, Value) = engine.read_named_from(buf.as_slice()).unwrap();
    assert_eq!(name, "level");
    assert_eq!(value.get_byte("a"), Some(1));
}

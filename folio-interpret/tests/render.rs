use folio_interpret::{
    DocumentCache, DrawCommand, GraphicsState, Interpreter, InterpreterSettings, Paint, Page,
    RecordingCanvas, render_page,
};
use folio_syntax::content::{Operation, Operator, parse_all};
use folio_syntax::object::{Dict, ObjRef, Object, ObjectStore, Stream};
use kurbo::{Affine, Point, Rect};

fn dict(src: &[u8]) -> Dict {
    Object::from_bytes(src).unwrap().as_dict().unwrap().clone()
}

fn stream(src: &[u8], data: &[u8]) -> Object {
    Object::Stream(Stream::new(dict(src), data.to_vec()))
}

fn render(store: &ObjectStore, content: &[u8], resources: Dict, size: f64) -> Vec<DrawCommand> {
    let page = Page::new(content.to_vec(), resources, Rect::new(0.0, 0.0, size, size));
    let mut canvas = RecordingCanvas::new();

    render_page(
        &page,
        store,
        &mut canvas,
        &InterpreterSettings::default(),
        &DocumentCache::new(),
    )
    .unwrap();

    canvas.commands().to_vec()
}

fn bitmaps(commands: &[DrawCommand]) -> Vec<&folio_interpret::image::Bitmap> {
    commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::DrawBitmap(b) => Some(b),
            _ => None,
        })
        .collect()
}

fn interpret_with_hook(
    content: &[u8],
    mut hook: impl FnMut(&Operation, &GraphicsState),
) {
    let store = ObjectStore::new();
    let cache = DocumentCache::new();
    let settings = InterpreterSettings::default();
    let mut canvas = RecordingCanvas::new();

    Interpreter::new(
        &store,
        &mut canvas,
        &settings,
        &cache,
        Affine::IDENTITY,
        Rect::new(0.0, 0.0, 100.0, 100.0),
    )
    .with_operation_hook(|op, state| hook(op, state))
    .run(content, &Dict::new())
    .unwrap();
}

#[test]
fn every_leaf_is_visited_once_in_order() {
    let content = b"q 1 0 0 1 5 5 cm 0 0 m 10 10 l S Q \
        /Span <</MCID 0>> BDC BT 12 TL (a) ' T* ET EMC \
        BI /W 1 /H 1 /BPC 8 /CS /G ID \x80 EI \
        /P0 MP 0.5 g 0 0 5 5 re W n q Q 1 w";

    let mut expected = vec![];
    for object in parse_all(content).unwrap() {
        object.for_each_leaf(&mut |op| expected.push(op.clone()));
    }

    let mut visited = vec![];
    interpret_with_hook(content, |op, _| visited.push(op.clone()));

    assert_eq!(visited, expected);
    assert_eq!(visited.len(), 15);
}

/// State changes, every one of them undone by the matching `Q`.
const MUTATIONS: &[&str] = &[
    "2 w",
    "1 J",
    "2 j",
    "[2 1] 0 d",
    "0.5 0 0 0.5 3 4 cm",
    "0.2 0.4 0.6 rg",
    "0.1 0.2 0.3 0.4 K",
    "/DeviceCMYK cs",
    "3 Tc",
    "2 Tw",
    "80 Tz",
    "14 TL",
    "5 Tr",
    "2 Ts",
    "0 0 10 10 re W n",
];

/// Nesting depths to check, from a single pair up to deep stacks.
const DEPTHS: &[usize] = &[1, 2, 3, 5, 8, 13, 21, 34, 50];

/// Wrap `depth` levels of `q`/`Q` around each other, with a few state
/// changes at every level. Which changes are made depends on `seed`.
fn nested(seed: usize, depth: usize, out: &mut String) {
    for i in 0..(seed + depth) % 3 {
        out.push_str(MUTATIONS[(seed * 7 + depth * 3 + i) % MUTATIONS.len()]);
        out.push(' ');
    }

    if depth == 0 {
        return;
    }

    out.push_str(&format!("/Before{depth} MP q "));
    nested(seed, depth - 1, out);
    out.push_str(&format!("Q /After{depth} MP "));
}

#[test]
fn restore_undoes_every_change() {
    for (seed, &depth) in DEPTHS.iter().enumerate() {
        let mut content = String::new();
        nested(seed, depth, &mut content);

        let mut markers = vec![];
        interpret_with_hook(content.as_bytes(), |op, state| {
            if op.operator == Operator::MarkedContentPoint {
                let name = op.name(0).unwrap().as_str().to_owned();
                markers.push((name, state.clone()));
            }
        });

        assert_eq!(markers.len(), depth * 2);

        for level in 1..=depth {
            let find = |name: String| {
                markers
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, s)| s.clone())
                    .unwrap()
            };

            assert_eq!(
                find(format!("Before{level}")),
                find(format!("After{level}")),
                "state differs around level {level} of {content}"
            );
        }
    }
}

#[test]
fn cmyk_fills() {
    let commands = render(
        &ObjectStore::new(),
        b"0 0 0 0 k 0 0 5 5 re f 0 0 0 1 k 0 0 5 5 re f 1 0 0 0 k 0 0 5 5 re f",
        Dict::new(),
        10.0,
    );

    let colors = commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::DrawPath(Paint::Color(c), _) => Some(c.to_rgba8()),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(
        colors,
        [[255, 255, 255, 255], [0, 0, 0, 255], [0, 255, 255, 255]]
    );
}

/// Count the fills that are not clipped away entirely, tracking the clip
/// as a device space bounding box.
fn visible_fills(commands: &[DrawCommand]) -> usize {
    let mut matrix = Affine::IDENTITY;
    let mut clip = Rect::new(f64::MIN, f64::MIN, f64::MAX, f64::MAX);
    let mut saved = vec![];
    let mut path: Option<Rect> = None;
    let mut visible = 0;

    let add = |path: &mut Option<Rect>, p: Point| {
        let r = Rect::from_points(p, p);
        *path = Some(path.map_or(r, |old| old.union(r)));
    };

    for command in commands {
        match command {
            DrawCommand::SetMatrix(m) => matrix = *m,
            DrawCommand::Save => saved.push(clip),
            DrawCommand::Restore => clip = saved.pop().unwrap(),
            DrawCommand::MoveTo(p) | DrawCommand::LineTo(p) => add(&mut path, matrix * *p),
            DrawCommand::CubicTo(_, _, p) => add(&mut path, matrix * *p),
            DrawCommand::ClipPath(_) => {
                clip = clip.intersect(path.take().unwrap_or_default());
            }
            DrawCommand::DrawPath(..) => {
                let area = path.take().unwrap_or_default().intersect(clip).area();

                if area > 0.0 {
                    visible += 1;
                }
            }
            _ => {}
        }
    }

    visible
}

#[test]
fn tiling_pattern_covers_three_by_three_cells() {
    let mut store = ObjectStore::new();
    store.insert(
        ObjRef::new(1, 0),
        stream(
            b"<< /PatternType 1 /PaintType 1 /TilingType 1 /BBox [0 0 10 10] /XStep 10 /YStep 10 >>",
            b"1 0 0 rg 0 0 10 10 re f",
        ),
    );

    let cache = DocumentCache::new();
    let settings = InterpreterSettings::default();
    let mut canvas = RecordingCanvas::new();

    Interpreter::new(
        &store,
        &mut canvas,
        &settings,
        &cache,
        Affine::IDENTITY,
        Rect::new(0.0, 0.0, 30.0, 30.0),
    )
    .run(
        b"/Pattern cs /P0 scn 0 0 30 30 re f",
        &dict(b"<< /Pattern << /P0 1 0 R >> >>"),
    )
    .unwrap();

    // Every replay of the cell sets the matrix of its fill to the cell's
    // placement.
    let mut matrix = Affine::IDENTITY;
    let mut fills = vec![];

    for command in canvas.commands() {
        match command {
            DrawCommand::SetMatrix(m) => matrix = *m,
            DrawCommand::DrawPath(Paint::Color(c), _) => {
                assert_eq!(c.to_rgba8(), [255, 0, 0, 255]);
                fills.push(matrix);
            }
            _ => {}
        }
    }

    assert_eq!(fills.len(), 9);
    assert_eq!(visible_fills(canvas.commands()), 9);

    let mut offsets = fills
        .iter()
        .map(|m| {
            let [a, b, c, d, e, f] = m.as_coeffs();
            assert_eq!([a, b, c, d], [1.0, 0.0, 0.0, 1.0]);

            (e as i64, f as i64)
        })
        .collect::<Vec<_>>();
    offsets.sort_unstable();

    let expected = (0..3)
        .flat_map(|x| (0..3).map(move |y| (x * 10, y * 10)))
        .collect::<Vec<_>>();
    assert_eq!(offsets, expected);
}

fn soft_masked(mask_value: u8) -> Vec<[u8; 4]> {
    let mut store = ObjectStore::new();
    store.insert(
        ObjRef::new(1, 0),
        stream(
            b"<< /Subtype /Image /Width 2 /Height 2 /ColorSpace /DeviceRGB \
              /BitsPerComponent 8 /SMask 2 0 R >>",
            &[255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        ),
    );
    store.insert(
        ObjRef::new(2, 0),
        stream(
            b"<< /Subtype /Image /Width 2 /Height 2 /ColorSpace /DeviceGray /BitsPerComponent 8 >>",
            &[mask_value; 4],
        ),
    );

    let commands = render(
        &store,
        b"10 0 0 10 0 0 cm /Im0 Do",
        dict(b"<< /XObject << /Im0 1 0 R >> >>"),
        10.0,
    );
    let bitmap = bitmaps(&commands)[0];

    (0..4)
        .map(|i| bitmap.pixel(i % 2, i / 2).unwrap())
        .collect()
}

#[test]
fn soft_mask_sets_alpha() {
    assert!(soft_masked(255).iter().all(|p| p[3] == 255));
    assert_eq!(soft_masked(255)[0], [255, 0, 0, 255]);
    assert!(soft_masked(0).iter().all(|p| p[3] == 0));
}

#[test]
fn inline_image_data_may_contain_ei() {
    let commands = render(
        &ObjectStore::new(),
        b"BI /W 4 /H 1 /BPC 8 /CS /G ID EI\x00\xff EI 0 g",
        Dict::new(),
        10.0,
    );

    let bitmap = bitmaps(&commands)[0];
    let grays = (0..4)
        .map(|x| bitmap.pixel(x, 0).unwrap()[0])
        .collect::<Vec<_>>();

    assert_eq!(grays, [b'E', b'I', 0, 255]);
}

#[test]
fn filtered_inline_image_ends_at_ei() {
    let commands = render(
        &ObjectStore::new(),
        b"BI /W 2 /H 1 /BPC 8 /CS /RGB /F /AHx ID ff0000 00ff00> EI 0 0 1 1 re f",
        Dict::new(),
        10.0,
    );

    let bitmap = bitmaps(&commands)[0];
    assert_eq!(bitmap.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(bitmap.pixel(1, 0), Some([0, 255, 0, 255]));
    assert!(matches!(commands.last(), Some(DrawCommand::Restore)));
    assert!(commands.iter().any(|c| matches!(c, DrawCommand::DrawPath(..))));
}

#[test]
fn malformed_page_is_reported() {
    let page = Page::new(b"q Q ET".to_vec(), Dict::new(), Rect::new(0.0, 0.0, 10.0, 10.0));
    let mut canvas = RecordingCanvas::new();

    let result = render_page(
        &page,
        &ObjectStore::new(),
        &mut canvas,
        &InterpreterSettings::default(),
        &DocumentCache::new(),
    );

    assert!(result.is_err());
}
